//! DOM tree operations.
//!
//! The [`Dom`] struct owns an `Arena<Node>` and provides safe tree-manipulation
//! methods that keep the intrusive parent/child/sibling links consistent.
//! Every public mutation is reported to the [`MutationRegistry`].

use arena::Arena;

use crate::mutation::{MutationRecord, MutationRegistry};
use crate::node::{Attr, ElementData, Namespace, Node, NodeData, NodeId, ShadowRootMode};

/// How [`Dom::clear_children`] treats the subtrees it removes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BulkRemoval {
    /// Removed children keep their own subtrees.
    #[default]
    Standard,
    /// Legacy engines: every descendant of a removed child is orphaned too,
    /// and only the direct children appear in the mutation record.
    Orphan,
}

const FORM_CONTROLS: &[&str] = &[
    "button", "fieldset", "input", "object", "output", "select", "textarea",
];

// ---------------------------------------------------------------------------
// Dom
// ---------------------------------------------------------------------------

/// The complete DOM tree.
#[derive(Default)]
pub struct Dom {
    pub nodes: Arena<Node>,
    pub mutations: MutationRegistry,
    bulk_removal: BulkRemoval,
}

impl Dom {
    /// Create an empty DOM (no document node yet).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bulk_removal(bulk_removal: BulkRemoval) -> Self {
        Self {
            bulk_removal,
            ..Self::default()
        }
    }

    pub fn bulk_removal(&self) -> BulkRemoval {
        self.bulk_removal
    }

    // =======================================================================
    // Node creation
    // =======================================================================

    pub fn create_document(&mut self) -> NodeId {
        self.nodes.allocate(Node::new(NodeData::Document))
    }

    /// Create an Element node.
    ///
    /// The `id` and `classes` caches are extracted from `attrs` automatically,
    /// as are the initial checkedness and value of form controls.
    pub fn create_element(&mut self, tag_name: &str, namespace: Namespace, attrs: Vec<Attr>) -> NodeId {
        let tag_name = match namespace {
            Namespace::Html => tag_name.to_ascii_lowercase(),
            _ => tag_name.to_string(),
        };
        let mut elem = ElementData {
            namespace,
            tag_name,
            attrs,
            id: None,
            classes: Vec::new(),
            checked: false,
            value: String::new(),
        };
        elem.sync_caches();
        elem.checked = match elem.tag_name.as_str() {
            "input" => elem.has_attr("checked"),
            "option" => elem.has_attr("selected"),
            _ => false,
        };
        elem.value = elem.attr("value").unwrap_or_default().to_string();
        self.nodes.allocate(Node::new(NodeData::Element(elem)))
    }

    /// Convenience: create an HTML element with no attributes.
    pub fn create_html_element(&mut self, tag_name: &str) -> NodeId {
        self.create_element(tag_name, Namespace::Html, Vec::new())
    }

    /// Convenience: create an HTML element from `(name, value)` pairs.
    pub fn create_html_element_with(&mut self, tag_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs.iter().map(|(n, v)| Attr::new(n, v)).collect();
        self.create_element(tag_name, Namespace::Html, attrs)
    }

    pub fn create_text(&mut self, data: &str) -> NodeId {
        let node = Node::new(NodeData::Text {
            data: data.to_string(),
        });
        self.nodes.allocate(node)
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        let node = Node::new(NodeData::Comment {
            data: data.to_string(),
        });
        self.nodes.allocate(node)
    }

    /// Attach a shadow root to `host`. Returns `None` if `host` is not an
    /// element or already has one.
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> Option<NodeId> {
        let node = self.nodes.get(host)?;
        if !node.is_element() || node.shadow_root.is_some() {
            return None;
        }
        let root = self
            .nodes
            .allocate(Node::new(NodeData::ShadowRoot { mode, host }));
        if let Some(node) = self.nodes.get_mut(host) {
            node.shadow_root = Some(root);
        }
        Some(root)
    }

    // =======================================================================
    // Tree mutation
    // =======================================================================

    /// Append `child` as the last child of `parent`.
    ///
    /// If `child` already has a parent it is first removed from there, which is
    /// reported as a separate removal record.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent`'s child list immediately before `reference`.
    ///
    /// If `reference` is `None` this behaves like `append_child`. Inserting a
    /// node into its own subtree, or before a node that is not a child of
    /// `parent`, does nothing.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if !self.nodes.contains(parent) || !self.nodes.contains(child) {
            return;
        }
        if self.is_inclusive_ancestor(child, parent) {
            return;
        }
        if let Some(r) = reference {
            if r == child || self.parent(r) != Some(parent) {
                return;
            }
        }

        self.remove(child);
        self.link_before(parent, child, reference);
        self.queue_record(MutationRecord::ChildList {
            target: parent,
            added_nodes: vec![child],
            removed_nodes: Vec::new(),
        });
    }

    /// Remove `child` from `parent`'s child list.
    ///
    /// The child becomes a detached root (parent = None). Does nothing if
    /// `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.parent(child) == Some(parent) {
            self.remove(child);
        }
    }

    /// Detach `node` from wherever it is.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.detach(node);
        self.queue_record(MutationRecord::ChildList {
            target: parent,
            added_nodes: Vec::new(),
            removed_nodes: vec![node],
        });
    }

    /// Remove every child of `parent` at once, the way assigning an empty
    /// `innerHTML` does. A single record lists all removed children.
    pub fn clear_children(&mut self, parent: NodeId) {
        let removed = self.children(parent);
        if removed.is_empty() {
            return;
        }
        let orphaning = self.bulk_removal == BulkRemoval::Orphan;
        for &child in &removed {
            let orphans = if orphaning {
                self.descendants(child)
            } else {
                Vec::new()
            };
            self.detach(child);
            for desc in orphans {
                self.unlink_all(desc);
            }
            if orphaning {
                self.unlink_all(child);
            }
        }
        self.queue_record(MutationRecord::ChildList {
            target: parent,
            added_nodes: Vec::new(),
            removed_nodes: removed,
        });
    }

    /// Detach `node` and free it together with its whole subtree, including
    /// attached shadow trees. Ids of freed nodes never resolve again.
    pub fn destroy(&mut self, node: NodeId) {
        self.remove(node);
        let mut doomed = vec![node];
        let mut i = 0;
        while i < doomed.len() {
            let id = doomed[i];
            doomed.extend(self.children(id));
            if let Some(shadow) = self.shadow_root(id) {
                doomed.push(shadow);
            }
            i += 1;
        }
        for id in doomed {
            self.nodes.deallocate(id);
        }
    }

    /// Link `child` (already detached) before `reference`, or at the end.
    fn link_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let prev = match reference {
            Some(r) => self.nodes.get(r).and_then(|n| n.prev_sibling),
            None => self.nodes.get(parent).and_then(|n| n.last_child),
        };

        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
            child_node.prev_sibling = prev;
            child_node.next_sibling = reference;
        }

        match prev {
            Some(prev_id) => {
                if let Some(prev_node) = self.nodes.get_mut(prev_id) {
                    prev_node.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.first_child = Some(child);
                }
            }
        }

        match reference {
            Some(r) => {
                if let Some(ref_node) = self.nodes.get_mut(r) {
                    ref_node.prev_sibling = Some(child);
                }
            }
            None => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.last_child = Some(child);
                }
            }
        }
    }

    /// Internal: detach a node from its parent without deallocating it.
    fn detach(&mut self, node_id: NodeId) {
        let (parent_id, prev, next) = match self.nodes.get(node_id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        if let Some(prev_node) = prev.and_then(|id| self.nodes.get_mut(id)) {
            prev_node.next_sibling = next;
        }
        if let Some(next_node) = next.and_then(|id| self.nodes.get_mut(id)) {
            next_node.prev_sibling = prev;
        }
        if let Some(parent_node) = parent_id.and_then(|id| self.nodes.get_mut(id)) {
            if parent_node.first_child == Some(node_id) {
                parent_node.first_child = next;
            }
            if parent_node.last_child == Some(node_id) {
                parent_node.last_child = prev;
            }
        }

        if let Some(node) = self.nodes.get_mut(node_id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    /// Internal: forget every tree link of `node` without touching neighbours.
    fn unlink_all(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
            node.first_child = None;
            node.last_child = None;
        }
    }

    // =======================================================================
    // Attributes and form state
    // =======================================================================

    pub fn get_attribute(&self, el: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(el)?.as_element()?.attr(name)
    }

    pub fn has_attribute(&self, el: NodeId, name: &str) -> bool {
        self.get_attribute(el, name).is_some()
    }

    /// Set (or overwrite) an attribute. Setting an identical value is still
    /// reported, as a browser would.
    pub fn set_attribute(&mut self, el: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let Some(elem) = self.nodes.get_mut(el).and_then(Node::as_element_mut) else {
            return;
        };
        let old_value = match elem.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => Some(std::mem::replace(&mut attr.value, value.to_string())),
            None => {
                elem.attrs.push(Attr::new(&name, value));
                None
            }
        };
        elem.sync_caches();
        self.queue_record(MutationRecord::Attributes {
            target: el,
            attribute_name: name,
            old_value,
        });
    }

    pub fn remove_attribute(&mut self, el: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        let Some(elem) = self.nodes.get_mut(el).and_then(Node::as_element_mut) else {
            return;
        };
        let Some(pos) = elem.attrs.iter().position(|a| a.name == name) else {
            return;
        };
        let old = elem.attrs.remove(pos);
        elem.sync_caches();
        self.queue_record(MutationRecord::Attributes {
            target: el,
            attribute_name: name,
            old_value: Some(old.value),
        });
    }

    /// Add or remove a single class token.
    pub fn toggle_class(&mut self, el: NodeId, class: &str, on: bool) {
        let Some(elem) = self.nodes.get(el).and_then(Node::as_element) else {
            return;
        };
        if elem.has_class(class) == on {
            return;
        }
        let mut classes: Vec<&str> = elem.classes.iter().map(String::as_str).collect();
        if on {
            classes.push(class);
        } else {
            classes.retain(|c| *c != class);
        }
        let value = classes.join(" ");
        self.set_attribute(el, "class", &value);
    }

    /// Change checkedness. This is live state, not markup: no record is produced.
    pub fn set_checked(&mut self, el: NodeId, checked: bool) {
        if let Some(elem) = self.nodes.get_mut(el).and_then(Node::as_element_mut) {
            elem.checked = checked;
        }
    }

    pub fn is_checked(&self, el: NodeId) -> bool {
        self.nodes
            .get(el)
            .and_then(Node::as_element)
            .is_some_and(|e| e.checked)
    }

    /// Change the current value of a form control. No record is produced.
    pub fn set_value(&mut self, el: NodeId, value: &str) {
        if let Some(elem) = self.nodes.get_mut(el).and_then(Node::as_element_mut) {
            elem.value = value.to_string();
        }
    }

    pub fn value(&self, el: NodeId) -> Option<&str> {
        self.nodes
            .get(el)
            .and_then(Node::as_element)
            .map(|e| e.value.as_str())
    }

    /// Reflects to the `disabled` attribute, so it is observable as a mutation.
    pub fn set_disabled(&mut self, el: NodeId, disabled: bool) {
        if disabled {
            self.set_attribute(el, "disabled", "");
        } else {
            self.remove_attribute(el, "disabled");
        }
    }

    // =======================================================================
    // Traversal
    // =======================================================================

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.contains(node)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(Node::is_element)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        self.nodes.get(node).and_then(Node::as_element)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    /// Return the immediate children of `parent` in document order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes.get(parent).and_then(|n| n.first_child);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.nodes.get(id).and_then(|n| n.next_sibling);
        }
        out
    }

    /// Element children only.
    pub fn element_children(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent)
            .into_iter()
            .filter(|&id| self.is_element(id))
            .collect()
    }

    /// Return the chain of ancestors from `node` up to (and including) the root.
    /// The first element is the direct parent, the last is the root.
    ///
    /// The walk stops at a shadow root; it does not continue into the host.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(node);
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.parent(id);
        }
        out
    }

    /// Return all descendants of `node` in pre-order DFS (not including `node` itself).
    /// Shadow trees are not entered.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    /// Element descendants in document order.
    pub fn element_descendants(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&id| self.is_element(id))
            .collect()
    }

    /// `true` if `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    /// Topmost node reachable through parent links: a document, a shadow
    /// root, or the root of a detached subtree.
    pub fn root_of(&self, node: NodeId) -> NodeId {
        self.ancestors(node).last().copied().unwrap_or(node)
    }

    /// First element child of a document node.
    pub fn document_element(&self, document: NodeId) -> Option<NodeId> {
        match self.nodes.get(document)?.data {
            NodeData::Document => self.element_children(document).into_iter().next(),
            _ => None,
        }
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.nodes.get(host).and_then(|n| n.shadow_root)
    }

    pub fn shadow_host(&self, shadow_root: NodeId) -> Option<NodeId> {
        match self.nodes.get(shadow_root)?.data {
            NodeData::ShadowRoot { host, .. } => Some(host),
            _ => None,
        }
    }

    // =======================================================================
    // Queries
    // =======================================================================

    /// Find the first element with the given `id` attribute in the subtree
    /// rooted at `root` (pre-order DFS).
    pub fn get_element_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .find(|&n| self.element(n).is_some_and(|e| e.id.as_deref() == Some(id)))
    }

    /// Return all elements with the given tag name (ASCII case-insensitive)
    /// in the subtree rooted at `root`, including `root` itself.
    pub fn get_elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|&n| {
                self.element(n)
                    .is_some_and(|e| e.tag_name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    // =======================================================================
    // Forms
    // =======================================================================

    pub fn is_form_control(&self, el: NodeId) -> bool {
        self.tag_name(el).is_some_and(|t| FORM_CONTROLS.contains(&t))
    }

    /// The form a control belongs to: the element named by its `form`
    /// attribute, otherwise the nearest ancestor `<form>`.
    pub fn form_owner(&self, el: NodeId) -> Option<NodeId> {
        if !self.is_form_control(el) {
            return None;
        }
        if let Some(form_id) = self.get_attribute(el, "form") {
            let form = self.get_element_by_id(self.root_of(el), form_id)?;
            return (self.tag_name(form) == Some("form")).then_some(form);
        }
        self.ancestors(el)
            .into_iter()
            .find(|&a| self.tag_name(a) == Some("form"))
    }

    /// Controls owned by `form`, in tree order. Includes controls outside the
    /// form that point at it with a `form` attribute.
    pub fn form_elements(&self, form: NodeId) -> Vec<NodeId> {
        self.descendants(self.root_of(form))
            .into_iter()
            .filter(|&n| self.form_owner(n) == Some(form))
            .collect()
    }

    // =======================================================================
    // Mutation records
    // =======================================================================

    fn queue_record(&mut self, record: MutationRecord) {
        if !self.mutations.has_observers() {
            return;
        }
        let target = record.target();
        let mut chain = vec![target];
        chain.extend(self.ancestors(target));
        self.mutations.enqueue(&chain, record);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
