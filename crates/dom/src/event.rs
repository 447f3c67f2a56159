//! DOM Event system.
//!
//! Implements the W3C DOM event dispatch algorithm:
//!   1. Build the propagation path from target to root.
//!   2. **Capture phase**: walk root → target.parent, invoke capture listeners.
//!   3. **At-target phase**: invoke both capture and bubble listeners on target.
//!   4. **Bubble phase**: walk target.parent → root, invoke bubble listeners.
//!
//! `stopPropagation` and `stopImmediatePropagation` are respected.

use std::collections::HashMap;
use std::rc::Rc;

use crate::node::NodeId;
use crate::tree::Dom;

/// Which phase of the dispatch algorithm is currently executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPhase {
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// A DOM event that can be dispatched through the tree.
#[derive(Clone, Debug)]
pub struct Event {
    /// Event type name (e.g. `"change"`, `"click"`).
    pub type_: String,
    /// The node the event was originally dispatched on.
    pub target: Option<NodeId>,
    /// The node whose listeners are currently being invoked.
    pub current_target: Option<NodeId>,
    pub phase: EventPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    pub immediate_propagation_stopped: bool,
}

impl Event {
    pub fn new(type_: &str, bubbles: bool, cancelable: bool) -> Self {
        Self {
            type_: type_.to_string(),
            target: None,
            current_target: None,
            phase: EventPhase::None,
            bubbles,
            cancelable,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop the event from propagating to subsequent nodes, but allow all
    /// listeners on the *current* node to finish.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop *all* further processing: no more listeners, no more nodes.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Handle returned when registering a listener; used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerCallback = Rc<dyn Fn(&mut Event)>;

/// A single event listener attached to a node.
#[derive(Clone)]
pub struct EventListener {
    pub type_: String,
    /// If `true` this listener fires during the capture phase; otherwise during
    /// the bubble phase.
    pub capture: bool,
    callback: ListenerCallback,
}

impl EventListener {
    pub fn new<F>(type_: &str, capture: bool, callback: F) -> Self
    where
        F: Fn(&mut Event) + 'static,
    {
        Self {
            type_: type_.to_string(),
            capture,
            callback: Rc::new(callback),
        }
    }

    pub fn invoke(&self, event: &mut Event) {
        (self.callback)(event);
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListener")
            .field("type_", &self.type_)
            .field("capture", &self.capture)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventTarget map (lives alongside the Dom)
// ---------------------------------------------------------------------------

/// Stores event listeners for every node that has at least one.
#[derive(Debug, Default)]
pub struct EventTargetMap {
    listeners: HashMap<NodeId, Vec<(ListenerId, EventListener)>>,
    next_id: u64,
}

impl EventTargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, node: NodeId, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.entry(node).or_default().push((id, listener));
        id
    }

    /// Returns `false` if no such listener was registered on `node`.
    pub fn remove_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&node) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(&node);
        }
        removed
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.get(&node).map_or(0, Vec::len)
    }

    /// Return a snapshot of the listeners on `node` that match `type_`.
    pub fn matching_listeners(&self, node: NodeId, type_: &str) -> Vec<EventListener> {
        self.listeners
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|(_, l)| l.type_ == type_)
                    .map(|(_, l)| l.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Dispatch algorithm
// ---------------------------------------------------------------------------

/// Dispatch `event` at `target` through the DOM tree according to the W3C
/// event model (capture → at-target → bubble).
///
/// Returns `true` if the default action was *not* prevented.
pub fn dispatch_event(dom: &Dom, targets: &EventTargetMap, target: NodeId, event: &mut Event) -> bool {
    let path = propagation_path(dom, target);
    dispatch_along(&path, event, |node, type_| targets.matching_listeners(node, type_))
}

/// `[root, …, parent, target]`.
pub fn propagation_path(dom: &Dom, target: NodeId) -> Vec<NodeId> {
    let mut path = dom.ancestors(target);
    path.reverse();
    path.push(target);
    path
}

/// Run the three dispatch phases over a precomputed `path`, fetching each
/// node's listeners through `listeners_at` right before invoking them.
pub fn dispatch_along(
    path: &[NodeId],
    event: &mut Event,
    listeners_at: impl Fn(NodeId, &str) -> Vec<EventListener>,
) -> bool {
    let Some((&target, ancestors)) = path.split_last() else {
        return true;
    };
    event.target = Some(target);

    event.phase = EventPhase::Capturing;
    for &node in ancestors {
        if event.propagation_stopped {
            break;
        }
        let listeners = listeners_at(node, &event.type_);
        invoke_listeners(&listeners, node, event, Some(true));
    }

    if !event.propagation_stopped {
        event.phase = EventPhase::AtTarget;
        let listeners = listeners_at(target, &event.type_);
        invoke_listeners(&listeners, target, event, None);
    }

    if event.bubbles && !event.propagation_stopped {
        event.phase = EventPhase::Bubbling;
        for &node in ancestors.iter().rev() {
            if event.propagation_stopped {
                break;
            }
            let listeners = listeners_at(node, &event.type_);
            invoke_listeners(&listeners, node, event, Some(false));
        }
    }

    event.phase = EventPhase::None;
    event.current_target = None;

    !event.default_prevented
}

/// `capture`: `Some(flag)` only fires listeners with that capture flag,
/// `None` fires all of them (at-target phase).
fn invoke_listeners(listeners: &[EventListener], node: NodeId, event: &mut Event, capture: Option<bool>) {
    event.current_target = Some(node);
    for listener in listeners {
        if event.immediate_propagation_stopped {
            break;
        }
        if capture.is_some_and(|c| c != listener.capture) {
            continue;
        }
        listener.invoke(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Build a small tree:  root → parent → child
    fn setup() -> (Dom, EventTargetMap, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let root = dom.create_html_element("div");
        let parent = dom.create_html_element("section");
        let child = dom.create_html_element("span");
        dom.append_child(root, parent);
        dom.append_child(parent, child);
        (dom, EventTargetMap::new(), root, parent, child)
    }

    fn recorder(order: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> impl Fn(&mut Event) + 'static {
        let order = order.clone();
        move |_evt| order.borrow_mut().push(label)
    }

    #[test]
    fn capture_target_bubble_order() {
        let (dom, mut targets, root, parent, child) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));

        targets.add_listener(root, EventListener::new("change", true, recorder(&order, "root-capture")));
        targets.add_listener(root, EventListener::new("change", false, recorder(&order, "root-bubble")));
        targets.add_listener(parent, EventListener::new("change", false, recorder(&order, "parent-bubble")));
        targets.add_listener(child, EventListener::new("change", false, recorder(&order, "target")));

        let mut event = Event::new("change", true, false);
        dispatch_event(&dom, &targets, child, &mut event);

        assert_eq!(
            *order.borrow(),
            vec!["root-capture", "target", "parent-bubble", "root-bubble"]
        );
        assert_eq!(event.phase, EventPhase::None);
        assert_eq!(event.target, Some(child));
    }

    #[test]
    fn non_bubbling_event_skips_ancestors() {
        let (dom, mut targets, root, _parent, child) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        targets.add_listener(root, EventListener::new("focus", false, recorder(&order, "root")));
        targets.add_listener(child, EventListener::new("focus", false, recorder(&order, "child")));

        let mut event = Event::new("focus", false, false);
        dispatch_event(&dom, &targets, child, &mut event);
        assert_eq!(*order.borrow(), vec!["child"]);
    }

    #[test]
    fn stop_propagation_at_target() {
        let (dom, mut targets, root, _parent, child) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        targets.add_listener(child, EventListener::new("change", false, |evt| evt.stop_propagation()));
        targets.add_listener(child, EventListener::new("change", false, recorder(&order, "second")));
        targets.add_listener(root, EventListener::new("change", false, recorder(&order, "root")));

        let mut event = Event::new("change", true, false);
        dispatch_event(&dom, &targets, child, &mut event);
        assert_eq!(*order.borrow(), vec!["second"]);
    }

    #[test]
    fn stop_immediate_propagation_skips_siblings() {
        let (dom, mut targets, _root, _parent, child) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        targets.add_listener(child, EventListener::new("change", false, |evt| evt.stop_immediate_propagation()));
        targets.add_listener(child, EventListener::new("change", false, recorder(&order, "second")));

        let mut event = Event::new("change", true, false);
        dispatch_event(&dom, &targets, child, &mut event);
        assert!(order.borrow().is_empty());
    }

    #[test]
    fn prevent_default_only_when_cancelable() {
        let (dom, mut targets, _root, _parent, child) = setup();
        targets.add_listener(child, EventListener::new("submit", false, |evt| evt.prevent_default()));

        let mut cancelable = Event::new("submit", true, true);
        assert!(!dispatch_event(&dom, &targets, child, &mut cancelable));
        let mut plain = Event::new("submit", true, false);
        assert!(dispatch_event(&dom, &targets, child, &mut plain));
    }

    #[test]
    fn remove_listener_by_id() {
        let (dom, mut targets, _root, _parent, child) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        let id = targets.add_listener(child, EventListener::new("change", false, recorder(&order, "gone")));
        assert!(targets.remove_listener(child, id));
        assert!(!targets.remove_listener(child, id));
        assert_eq!(targets.listener_count(child), 0);

        let mut event = Event::new("change", true, false);
        dispatch_event(&dom, &targets, child, &mut event);
        assert!(order.borrow().is_empty());
    }
}
