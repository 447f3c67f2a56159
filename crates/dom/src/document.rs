//! Shared document handle.
//!
//! [`Document`] bundles a [`Dom`] with its event listeners behind an `Rc`, so
//! several owners on one thread (a watcher, the embedding code, listeners) can
//! reach the same tree. Borrows are short: no `Dom` borrow is held while an
//! event listener runs, so listeners may freely mutate the tree.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::event::{dispatch_along, propagation_path, Event, EventListener, EventTargetMap, ListenerId};
use crate::node::NodeId;
use crate::tree::{BulkRemoval, Dom};

struct DocumentInner {
    dom: RefCell<Dom>,
    listeners: RefCell<EventTargetMap>,
    node: NodeId,
}

#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document containing an empty `<html><head></head><body></body></html>`.
    pub fn new() -> Self {
        Self::with_bulk_removal(BulkRemoval::Standard)
    }

    pub fn with_bulk_removal(bulk_removal: BulkRemoval) -> Self {
        let mut dom = Dom::with_bulk_removal(bulk_removal);
        let node = dom.create_document();
        let html = dom.create_html_element("html");
        let head = dom.create_html_element("head");
        let body = dom.create_html_element("body");
        dom.append_child(node, html);
        dom.append_child(html, head);
        dom.append_child(html, body);
        Self {
            inner: Rc::new(DocumentInner {
                dom: RefCell::new(dom),
                listeners: RefCell::new(EventTargetMap::new()),
                node,
            }),
        }
    }

    /// The document node itself.
    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    pub fn dom(&self) -> Ref<'_, Dom> {
        self.inner.dom.borrow()
    }

    pub fn dom_mut(&self) -> RefMut<'_, Dom> {
        self.inner.dom.borrow_mut()
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.dom().document_element(self.inner.node)
    }

    pub fn body(&self) -> Option<NodeId> {
        let dom = self.dom();
        let html = dom.document_element(self.inner.node)?;
        dom.element_children(html)
            .into_iter()
            .find(|&n| dom.tag_name(n) == Some("body"))
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -- tree shortcuts ------------------------------------------------------

    /// Create an HTML element from `(name, value)` attribute pairs.
    pub fn create_element(&self, tag_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.dom_mut().create_html_element_with(tag_name, attrs)
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.dom_mut().append_child(parent, child);
    }

    pub fn remove(&self, node: NodeId) {
        self.dom_mut().remove(node);
    }

    pub fn set_attribute(&self, el: NodeId, name: &str, value: &str) {
        self.dom_mut().set_attribute(el, name, value);
    }

    pub fn remove_attribute(&self, el: NodeId, name: &str) {
        self.dom_mut().remove_attribute(el, name);
    }

    // -- events --------------------------------------------------------------

    pub fn add_event_listener<F>(&self, node: NodeId, type_: &str, capture: bool, callback: F) -> ListenerId
    where
        F: Fn(&mut Event) + 'static,
    {
        self.inner
            .listeners
            .borrow_mut()
            .add_listener(node, EventListener::new(type_, capture, callback))
    }

    pub fn remove_event_listener(&self, node: NodeId, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove_listener(node, id)
    }

    /// Dispatch `event` at `target`. Returns `true` if the default action
    /// was not prevented.
    pub fn dispatch_event(&self, target: NodeId, event: &mut Event) -> bool {
        let path = propagation_path(&self.dom(), target);
        dispatch_along(&path, event, |node, type_| {
            self.inner.listeners.borrow().matching_listeners(node, type_)
        })
    }

    /// Fire a bubbling, non-cancelable event of `type_` at `target`, the way
    /// a form control fires `change` after user input.
    pub fn fire(&self, target: NodeId, type_: &str) {
        let mut event = Event::new(type_, true, false);
        self.dispatch_event(target, &mut event);
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").field("node", &self.inner.node).finish()
    }
}
