//! Change detection.
//!
//! Turns a scan root, a mutation batch or a set of changed form controls into
//! an ordered list of [`Change`]s. Nothing here runs user code, and nothing
//! here filters duplicates: the apply pass is idempotent, so an `Add` for an
//! already active pair is simply skipped there.

use dom::{Dom, MutationRecord, NodeId};
use tracing::debug;

use crate::registry::{Engine, ObserverId};
use crate::support::supports_selector_matching;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    /// The observer's selector now matches the element.
    Add(NodeId, ObserverId),
    /// The observer's selector stopped matching the element.
    Remove(NodeId, ObserverId),
    /// The element left the tree: every observer active on it stops.
    RemoveSubtree(NodeId),
}

impl Change {
    pub fn element(&self) -> NodeId {
        match *self {
            Change::Add(el, _) | Change::Remove(el, _) | Change::RemoveSubtree(el) => el,
        }
    }
}

/// Direct matches of each node, then the matches below it.
pub(crate) fn add_nodes(engine: &Engine, dom: &Dom, nodes: &[NodeId], changes: &mut Vec<Change>) {
    for &node in nodes {
        if supports_selector_matching(dom, node) {
            for m in engine.selector_set.matches(dom, node) {
                changes.push(Change::Add(node, *m.data));
            }
        }
        for group in engine.selector_set.query_all(dom, node) {
            for &el in &group.elements {
                changes.push(Change::Add(el, *group.data));
            }
        }
    }
}

/// One `RemoveSubtree` per removed element and per element below it, walked
/// now since the subtree may not be reachable later.
pub(crate) fn remove_nodes(dom: &Dom, nodes: &[NodeId], changes: &mut Vec<Change>) {
    for &node in nodes {
        if !supports_selector_matching(dom, node) {
            continue;
        }
        changes.push(Change::RemoveSubtree(node));
        for el in dom.element_descendants(node) {
            changes.push(Change::RemoveSubtree(el));
        }
    }
}

/// Re-check one element: `Add` for every current match, `Remove` for every
/// active observer whose selector no longer matches.
pub(crate) fn revalidate(engine: &Engine, dom: &Dom, node: NodeId, changes: &mut Vec<Change>) {
    if !supports_selector_matching(dom, node) {
        return;
    }
    for m in engine.selector_set.matches(dom, node) {
        changes.push(Change::Add(node, *m.data));
    }
    for id in engine.active_ids(node) {
        let Some(selector) = engine.selector(id) else {
            continue;
        };
        let still_matches = engine
            .selector_set
            .matches_selector(dom, node, selector)
            .unwrap_or(false);
        if !still_matches {
            changes.push(Change::Remove(node, id));
        }
    }
}

/// [`revalidate`] over `container` and every element below it.
pub(crate) fn revalidate_descendants(engine: &Engine, dom: &Dom, container: NodeId, changes: &mut Vec<Change>) {
    revalidate(engine, dom, container, changes);
    for el in dom.element_descendants(container) {
        revalidate(engine, dom, el, changes);
    }
}

/// Re-check the controls affected by a value change on each of `targets`:
/// every control of the target's form, or without a form every `input` under
/// `root` and the target itself.
pub(crate) fn revalidate_inputs(
    engine: &Engine,
    dom: &Dom,
    root: NodeId,
    targets: &[NodeId],
    changes: &mut Vec<Change>,
) {
    for &target in targets {
        let controls = match dom.form_owner(target) {
            Some(form) => dom.form_elements(form),
            None => {
                let mut inputs: Vec<NodeId> = dom
                    .get_elements_by_tag(root, "input")
                    .into_iter()
                    .filter(|&el| el != root)
                    .collect();
                if !inputs.contains(&target) {
                    inputs.push(target);
                }
                inputs
            }
        };
        for el in controls {
            if dom.is_inclusive_ancestor(root, el) {
                revalidate(engine, dom, el, changes);
            }
        }
    }
}

/// `RemoveSubtree` for every added element that no longer exists and, when
/// `include_detached` is set, for every added element that lost its parent.
/// The watcher root itself is never treated as detached.
pub(crate) fn sweep_orphans(
    engine: &Engine,
    dom: &Dom,
    root: NodeId,
    include_detached: bool,
    changes: &mut Vec<Change>,
) {
    for id in engine.observer_ids() {
        for el in engine.elements(id) {
            let dead = !dom.is_alive(el);
            let detached = include_detached && el != root && dom.parent(el).is_none();
            if dead || detached {
                changes.push(Change::RemoveSubtree(el));
            }
        }
    }
}

/// Translate one mutation batch, records in delivery order.
pub(crate) fn handle_mutations(
    engine: &Engine,
    dom: &Dom,
    root: NodeId,
    records: &[MutationRecord],
    sweep_detached: bool,
) -> Vec<Change> {
    let mut changes = Vec::new();
    for record in records {
        match record {
            MutationRecord::ChildList {
                added_nodes,
                removed_nodes,
                ..
            } => {
                add_nodes(engine, dom, added_nodes, &mut changes);
                remove_nodes(dom, removed_nodes, &mut changes);
            }
            MutationRecord::Attributes { target, .. } => {
                revalidate(engine, dom, *target, &mut changes);
            }
        }
    }
    sweep_orphans(engine, dom, root, sweep_detached, &mut changes);
    debug!(records = records.len(), changes = changes.len(), "translated mutation batch");
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::Handlers;

    struct Fixture {
        dom: Dom,
        engine: Engine,
        root: NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut dom = Dom::new();
            let root = dom.create_html_element("body");
            Self {
                dom,
                engine: Engine::new(),
                root,
            }
        }

        fn observe(&mut self, selector: &str) -> ObserverId {
            self.engine.register(selector, Handlers::new()).unwrap()
        }

        fn el(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
            self.dom.create_html_element_with(tag, attrs)
        }
    }

    #[test]
    fn scan_emits_root_matches_then_descendants() {
        let mut f = Fixture::new();
        let body = f.observe("body");
        let foo = f.observe(".foo");
        let a = f.el("div", &[("class", "foo")]);
        let b = f.el("span", &[("class", "foo")]);
        f.dom.append_child(f.root, a);
        f.dom.append_child(a, b);

        let mut changes = Vec::new();
        add_nodes(&f.engine, &f.dom, &[f.root], &mut changes);
        assert_eq!(
            changes,
            vec![Change::Add(f.root, body), Change::Add(a, foo), Change::Add(b, foo)]
        );
    }

    #[test]
    fn removal_walks_the_whole_subtree() {
        let mut f = Fixture::new();
        let a = f.el("div", &[]);
        let b = f.el("div", &[]);
        let text = f.dom.create_text("x");
        f.dom.append_child(a, b);
        f.dom.append_child(a, text);

        let mut changes = Vec::new();
        remove_nodes(&f.dom, &[a, text], &mut changes);
        assert_eq!(changes, vec![Change::RemoveSubtree(a), Change::RemoveSubtree(b)]);
    }

    #[test]
    fn revalidate_reports_lost_matches() {
        let mut f = Fixture::new();
        let foo = f.observe(".foo");
        let bar = f.observe(".bar");
        let el = f.el("div", &[("class", "foo")]);
        f.dom.append_child(f.root, el);
        f.engine.activate(el, foo);

        f.dom.set_attribute(el, "class", "bar");
        let mut changes = Vec::new();
        revalidate(&f.engine, &f.dom, el, &mut changes);
        assert_eq!(changes, vec![Change::Add(el, bar), Change::Remove(el, foo)]);
    }

    #[test]
    fn attribute_record_revalidates_target() {
        let mut f = Fixture::new();
        let active = f.observe("[data-on]");
        let el = f.el("div", &[]);
        f.dom.append_child(f.root, el);
        let records = vec![MutationRecord::Attributes {
            target: el,
            attribute_name: "data-on".into(),
            old_value: None,
        }];

        f.dom.set_attribute(el, "data-on", "");
        let changes = handle_mutations(&f.engine, &f.dom, f.root, &records, false);
        assert_eq!(changes, vec![Change::Add(el, active)]);
    }

    #[test]
    fn child_list_record_adds_then_removes() {
        let mut f = Fixture::new();
        let div = f.observe("div");
        let added = f.el("div", &[]);
        let removed = f.el("div", &[]);
        f.dom.append_child(f.root, added);
        let records = vec![MutationRecord::ChildList {
            target: f.root,
            added_nodes: vec![added],
            removed_nodes: vec![removed],
        }];
        let changes = handle_mutations(&f.engine, &f.dom, f.root, &records, false);
        assert_eq!(changes, vec![Change::Add(added, div), Change::RemoveSubtree(removed)]);
    }

    #[test]
    fn sweep_finds_detached_and_dead_elements() {
        let mut f = Fixture::new();
        let id = f.observe("div");
        let attached = f.el("div", &[]);
        let detached = f.el("div", &[]);
        let doomed = f.el("div", &[]);
        f.dom.append_child(f.root, attached);
        f.dom.append_child(f.root, doomed);
        for el in [f.root, attached, detached, doomed] {
            f.engine.activate(el, id);
        }
        f.dom.destroy(doomed);

        let mut changes = Vec::new();
        sweep_orphans(&f.engine, &f.dom, f.root, false, &mut changes);
        assert_eq!(changes, vec![Change::RemoveSubtree(doomed)]);

        changes.clear();
        sweep_orphans(&f.engine, &f.dom, f.root, true, &mut changes);
        assert_eq!(
            changes,
            vec![Change::RemoveSubtree(detached), Change::RemoveSubtree(doomed)]
        );
    }

    #[test]
    fn input_change_uses_form_controls() {
        let mut f = Fixture::new();
        let checked = f.observe(":checked");
        let form = f.el("form", &[]);
        let a = f.el("input", &[("type", "radio"), ("name", "r")]);
        let b = f.el("input", &[("type", "radio"), ("name", "r")]);
        let outside = f.el("input", &[("type", "checkbox")]);
        f.dom.append_child(f.root, form);
        f.dom.append_child(form, a);
        f.dom.append_child(form, b);
        f.dom.append_child(f.root, outside);
        f.dom.set_checked(b, true);
        f.dom.set_checked(outside, true);

        let mut changes = Vec::new();
        revalidate_inputs(&f.engine, &f.dom, f.root, &[a], &mut changes);
        assert_eq!(changes, vec![Change::Add(b, checked)]);

        changes.clear();
        revalidate_inputs(&f.engine, &f.dom, f.root, &[outside], &mut changes);
        assert_eq!(changes, vec![Change::Add(b, checked), Change::Add(outside, checked)]);
    }

    #[test]
    fn input_change_stays_inside_root() {
        let mut f = Fixture::new();
        let checked = f.observe(":checked");
        let form = f.el("form", &[]);
        let scope = f.el("div", &[]);
        let inner = f.el("input", &[("type", "checkbox")]);
        let outer = f.el("input", &[("type", "checkbox")]);
        f.dom.append_child(f.root, form);
        f.dom.append_child(form, scope);
        f.dom.append_child(scope, inner);
        f.dom.append_child(form, outer);
        f.dom.set_checked(inner, true);
        f.dom.set_checked(outer, true);

        let mut changes = Vec::new();
        revalidate_inputs(&f.engine, &f.dom, scope, &[inner], &mut changes);
        assert_eq!(changes, vec![Change::Add(inner, checked)]);
    }
}
