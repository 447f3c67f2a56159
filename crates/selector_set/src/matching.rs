//! Selector matching: determine whether a DOM element matches a CSS selector.
//!
//! Complex selectors are matched **right-to-left**: we start with the rightmost
//! (subject) compound selector, then walk up/sideways through the DOM tree
//! following each combinator. Walks stop at the first non-element parent, so
//! a selector never reaches across a shadow root into its host.
//!
//! Form pseudo-classes read live element state (`checked`, `value`) rather
//! than attributes; that state changes without any mutation record.

use css::{AttrOp, Combinator, ComplexSelector, CompoundSelector, PseudoClass, SimpleSelector};
use dom::{Dom, ElementData, NodeData, NodeId};

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// `true` if `node_id` matches any selector in `list`.
pub fn matches_list(dom: &Dom, node_id: NodeId, list: &[ComplexSelector]) -> bool {
    list.iter().any(|sel| matches_selector(dom, node_id, sel))
}

/// Test whether the element `node_id` matches a full complex selector.
///
/// Returns `false` if `node_id` does not refer to a live element.
pub fn matches_selector(dom: &Dom, node_id: NodeId, selector: &ComplexSelector) -> bool {
    let Some(((subject, first_combinator), rest)) = selector.parts.split_first() else {
        return false;
    };
    if !matches_compound(dom, node_id, subject) {
        return false;
    }

    let mut current = node_id;
    let mut combinator = first_combinator.clone();

    for (compound, next_combinator) in rest {
        let found = match combinator {
            Some(Combinator::Child) => {
                parent_element(dom, current).filter(|&p| matches_compound(dom, p, compound))
            }
            Some(Combinator::Descendant) => {
                walk(current, |n| parent_element(dom, n)).find(|&a| matches_compound(dom, a, compound))
            }
            Some(Combinator::NextSibling) => {
                prev_sibling_element(dom, current).filter(|&s| matches_compound(dom, s, compound))
            }
            Some(Combinator::SubsequentSibling) => {
                walk(current, |n| prev_sibling_element(dom, n)).find(|&s| matches_compound(dom, s, compound))
            }
            // A combinator is missing only on the leftmost part.
            None => None,
        };
        match found {
            Some(next) => current = next,
            None => return false,
        }
        combinator = next_combinator.clone();
    }

    true
}

/// Test whether the element `node_id` matches a compound selector (all simples must match).
pub fn matches_compound(dom: &Dom, node_id: NodeId, compound: &CompoundSelector) -> bool {
    let Some(elem) = dom.element(node_id) else {
        return false;
    };
    compound
        .simples
        .iter()
        .all(|simple| matches_simple(dom, node_id, elem, simple))
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

fn matches_simple(dom: &Dom, node_id: NodeId, elem: &ElementData, simple: &SimpleSelector) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(tag) => elem.tag_name.eq_ignore_ascii_case(tag),
        SimpleSelector::Id(id) => elem.id.as_deref() == Some(id.as_str()),
        SimpleSelector::Class(cls) => elem.has_class(cls),
        SimpleSelector::Attribute {
            name,
            op,
            value,
            case_insensitive,
        } => matches_attribute(elem, name, op, value.as_deref(), *case_insensitive),
        SimpleSelector::PseudoClass(pc) => matches_pseudo_class(dom, node_id, elem, pc),
        // Pseudo-elements are never elements themselves.
        SimpleSelector::PseudoElement(_) => false,
    }
}

fn matches_attribute(
    elem: &ElementData,
    name: &str,
    op: &AttrOp,
    value: Option<&str>,
    case_insensitive: bool,
) -> bool {
    let Some(attr_val) = elem.attr(name) else {
        return false;
    };
    let Some(v) = value else {
        return matches!(op, AttrOp::Exists);
    };
    let (attr_val, v) = if case_insensitive {
        (attr_val.to_ascii_lowercase(), v.to_ascii_lowercase())
    } else {
        (attr_val.to_string(), v.to_string())
    };

    match op {
        AttrOp::Exists => true,
        AttrOp::Eq => attr_val == v,
        AttrOp::Includes => attr_val.split_whitespace().any(|word| word == v),
        AttrOp::DashMatch => attr_val == v || attr_val.starts_with(&format!("{v}-")),
        AttrOp::Prefix => !v.is_empty() && attr_val.starts_with(&v),
        AttrOp::Suffix => !v.is_empty() && attr_val.ends_with(&v),
        AttrOp::Substring => !v.is_empty() && attr_val.contains(&v),
    }
}

fn matches_pseudo_class(dom: &Dom, node_id: NodeId, elem: &ElementData, pc: &PseudoClass) -> bool {
    match pc {
        // No pointer or focus state exists here.
        PseudoClass::Hover
        | PseudoClass::Active
        | PseudoClass::Focus
        | PseudoClass::FocusVisible
        | PseudoClass::FocusWithin
        | PseudoClass::Visited => false,

        PseudoClass::Link | PseudoClass::AnyLink => {
            matches!(elem.tag_name.as_str(), "a" | "area") && elem.has_attr("href")
        }

        PseudoClass::Root => dom
            .parent(node_id)
            .and_then(|p| dom.nodes.get(p))
            .is_some_and(|p| matches!(p.data, NodeData::Document)),

        PseudoClass::Empty => dom.children(node_id).iter().all(|&c| {
            dom.nodes.get(c).is_none_or(|n| match &n.data {
                NodeData::Text { data } => data.trim().is_empty(),
                NodeData::Comment { .. } => true,
                _ => false,
            })
        }),

        PseudoClass::FirstChild => prev_sibling_element(dom, node_id).is_none() && has_parent(dom, node_id),
        PseudoClass::LastChild => next_sibling_element(dom, node_id).is_none() && has_parent(dom, node_id),
        PseudoClass::OnlyChild => {
            has_parent(dom, node_id)
                && prev_sibling_element(dom, node_id).is_none()
                && next_sibling_element(dom, node_id).is_none()
        }
        PseudoClass::FirstOfType => sibling_position(dom, node_id, true).is_some_and(|(before, _)| before == 0),
        PseudoClass::LastOfType => sibling_position(dom, node_id, true).is_some_and(|(_, after)| after == 0),
        PseudoClass::OnlyOfType => sibling_position(dom, node_id, true) == Some((0, 0)),
        PseudoClass::NthChild(a, b) => sibling_position(dom, node_id, false)
            .is_some_and(|(before, _)| nth_matches(*a, *b, before as i32 + 1)),
        PseudoClass::NthLastChild(a, b) => sibling_position(dom, node_id, false)
            .is_some_and(|(_, after)| nth_matches(*a, *b, after as i32 + 1)),
        PseudoClass::NthOfType(a, b) => sibling_position(dom, node_id, true)
            .is_some_and(|(before, _)| nth_matches(*a, *b, before as i32 + 1)),

        PseudoClass::Not(compounds) => !compounds.iter().any(|c| matches_compound(dom, node_id, c)),
        PseudoClass::Is(list) => matches_list(dom, node_id, list),

        PseudoClass::Checked => match elem.tag_name.as_str() {
            "input" => matches!(elem.input_type().as_str(), "checkbox" | "radio") && elem.checked,
            "option" => elem.checked,
            _ => false,
        },
        PseudoClass::Disabled => can_be_disabled(elem) && is_disabled(dom, node_id, elem),
        PseudoClass::Enabled => can_be_disabled(elem) && !is_disabled(dom, node_id, elem),
        PseudoClass::Required => is_requirable(elem) && elem.has_attr("required"),
        PseudoClass::Optional => is_requirable(elem) && !elem.has_attr("required"),
        PseudoClass::PlaceholderShown => {
            matches!(elem.tag_name.as_str(), "input" | "textarea")
                && elem.has_attr("placeholder")
                && elem.value.is_empty()
        }
    }
}

/// Check if An+B matches the given 1-based index.
fn nth_matches(a: i32, b: i32, n: i32) -> bool {
    if a == 0 {
        return n == b;
    }
    let diff = n - b;
    diff % a == 0 && diff / a >= 0
}

fn can_be_disabled(elem: &ElementData) -> bool {
    matches!(
        elem.tag_name.as_str(),
        "button" | "input" | "select" | "textarea" | "optgroup" | "option" | "fieldset"
    )
}

fn is_requirable(elem: &ElementData) -> bool {
    matches!(elem.tag_name.as_str(), "input" | "select" | "textarea")
}

/// Disabled by its own attribute, by a disabled `<optgroup>` (options), or
/// by a disabled ancestor `<fieldset>` unless inside that fieldset's first
/// `<legend>`.
fn is_disabled(dom: &Dom, node_id: NodeId, elem: &ElementData) -> bool {
    if elem.has_attr("disabled") {
        return true;
    }
    if elem.tag_name == "option" {
        let group = parent_element(dom, node_id).and_then(|p| dom.element(p));
        if group.is_some_and(|g| g.tag_name == "optgroup" && g.has_attr("disabled")) {
            return true;
        }
    }
    let mut child_on_path = node_id;
    for ancestor in walk(node_id, |n| parent_element(dom, n)) {
        let Some(anc) = dom.element(ancestor) else {
            break;
        };
        if anc.tag_name == "fieldset" && anc.has_attr("disabled") {
            let first_legend = dom
                .element_children(ancestor)
                .into_iter()
                .find(|&c| dom.tag_name(c) == Some("legend"));
            if first_legend != Some(child_on_path) {
                return true;
            }
        }
        child_on_path = ancestor;
    }
    false
}

// ─────────────────────────────────────────────────────────────────────────────
// DOM traversal helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Successive values of `step` starting after `start`.
fn walk(start: NodeId, step: impl Fn(NodeId) -> Option<NodeId>) -> impl Iterator<Item = NodeId> {
    std::iter::successors(step(start), move |&n| step(n))
}

fn has_parent(dom: &Dom, node_id: NodeId) -> bool {
    dom.parent(node_id).is_some()
}

/// Get the parent of `node_id` if it is an element.
fn parent_element(dom: &Dom, node_id: NodeId) -> Option<NodeId> {
    dom.parent(node_id).filter(|&p| dom.is_element(p))
}

fn prev_sibling_element(dom: &Dom, node_id: NodeId) -> Option<NodeId> {
    let prev = |n: NodeId| dom.nodes.get(n).and_then(|node| node.prev_sibling);
    walk(node_id, prev).find(|&s| dom.is_element(s))
}

fn next_sibling_element(dom: &Dom, node_id: NodeId) -> Option<NodeId> {
    let next = |n: NodeId| dom.nodes.get(n).and_then(|node| node.next_sibling);
    walk(node_id, next).find(|&s| dom.is_element(s))
}

/// Number of element siblings before and after `node_id`, optionally only
/// counting siblings with the same tag. `None` without a parent.
fn sibling_position(dom: &Dom, node_id: NodeId, same_type: bool) -> Option<(usize, usize)> {
    let parent = dom.parent(node_id)?;
    let tag = dom.tag_name(node_id)?;
    let siblings: Vec<NodeId> = dom
        .element_children(parent)
        .into_iter()
        .filter(|&s| !same_type || dom.tag_name(s) == Some(tag))
        .collect();
    let index = siblings.iter().position(|&s| s == node_id)?;
    Some((index, siblings.len() - index - 1))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
