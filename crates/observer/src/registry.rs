//! Observer table and per-element membership state.
//!
//! [`Engine`] is the bookkeeping half of a watcher. It never runs user code;
//! the apply pass reads callbacks out of it, releases the borrow, and only
//! then invokes them.
//!
//! Two side tables are keyed by element identity through
//! [`arena::SecondaryMap`], so a freed element's entries never leak onto a
//! node that later reuses its slot:
//!
//! - `initialized`: observers whose `initialize` already ran on the element,
//!   with any [`Initializer`] it returned. Never cleared by a remove.
//! - `active`: observers for which the element is currently added, in the
//!   order they were added, with live subscriptions.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use arena::SecondaryMap;
use dom::{Dom, NodeId};
use selector_set::{SelectorSet, SelectorSetError};

use crate::handlers::{Handlers, Initializer, Subscription};
use crate::watcher::Shared;

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    fn next() -> Self {
        ObserverId(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct ObserverRecord {
    pub(crate) selector: String,
    pub(crate) handlers: Handlers,
    /// Elements currently added, in add order.
    pub(crate) elements: Vec<NodeId>,
}

#[derive(Default)]
struct InitState {
    ids: Vec<ObserverId>,
    initializers: Vec<(ObserverId, Initializer)>,
}

#[derive(Default)]
struct ActiveEntry {
    ids: Vec<ObserverId>,
    subscriptions: Vec<(ObserverId, Subscription)>,
}

/// What a remove has to run once the engine borrow is released.
pub(crate) struct Deactivated {
    pub(crate) initializer: Option<Initializer>,
    pub(crate) subscription: Option<Subscription>,
}

#[derive(Default)]
pub(crate) struct Engine {
    pub(crate) observers: BTreeMap<ObserverId, ObserverRecord>,
    pub(crate) selector_set: SelectorSet<ObserverId>,
    initialized: SecondaryMap<InitState>,
    active: SecondaryMap<ActiveEntry>,
}

impl Engine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // -- observers -----------------------------------------------------------

    pub(crate) fn register(&mut self, selector: &str, handlers: Handlers) -> Result<ObserverId, SelectorSetError> {
        let id = ObserverId::next();
        self.selector_set.add(selector, id)?;
        self.observers.insert(
            id,
            ObserverRecord {
                selector: selector.to_string(),
                handlers,
                elements: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Drop the observer and every trace of it in the active table. Its
    /// `initialized` marks stay, since the id is never reused.
    pub(crate) fn deregister(&mut self, id: ObserverId) -> bool {
        let Some(record) = self.observers.remove(&id) else {
            return false;
        };
        self.selector_set.remove(&record.selector, &id);
        self.active.retain(|_, entry| {
            entry.ids.retain(|&i| i != id);
            entry.subscriptions.retain(|(i, _)| *i != id);
            !entry.ids.is_empty()
        });
        true
    }

    pub(crate) fn contains(&self, id: ObserverId) -> bool {
        self.observers.contains_key(&id)
    }

    /// Selector and a cheap clone of the handler set.
    pub(crate) fn observer_parts(&self, id: ObserverId) -> Option<(String, Handlers)> {
        self.observers
            .get(&id)
            .map(|o| (o.selector.clone(), o.handlers.clone()))
    }

    pub(crate) fn selector(&self, id: ObserverId) -> Option<&str> {
        self.observers.get(&id).map(|o| o.selector.as_str())
    }

    pub(crate) fn elements(&self, id: ObserverId) -> Vec<NodeId> {
        self.observers
            .get(&id)
            .map(|o| o.elements.clone())
            .unwrap_or_default()
    }

    pub(crate) fn observer_ids(&self) -> Vec<ObserverId> {
        self.observers.keys().copied().collect()
    }

    // -- initialized table ---------------------------------------------------

    /// Mark `id` as initialized on `el`. Returns `true` the first time only.
    pub(crate) fn mark_initialized(&mut self, el: NodeId, id: ObserverId) -> bool {
        let state = self.initialized.entry_or_default(el);
        if state.ids.contains(&id) {
            return false;
        }
        state.ids.push(id);
        true
    }

    #[cfg(test)]
    pub(crate) fn is_initialized(&self, el: NodeId, id: ObserverId) -> bool {
        self.initialized.get(el).is_some_and(|s| s.ids.contains(&id))
    }

    pub(crate) fn store_initializer(&mut self, el: NodeId, id: ObserverId, initializer: Initializer) {
        let state = self.initialized.entry_or_default(el);
        state.initializers.retain(|(i, _)| *i != id);
        state.initializers.push((id, initializer));
    }

    pub(crate) fn initializer(&self, el: NodeId, id: ObserverId) -> Option<Initializer> {
        self.initialized
            .get(el)?
            .initializers
            .iter()
            .find(|(i, _)| *i == id)
            .map(|(_, init)| init.clone())
    }

    /// Forget initialization state of elements that no longer exist.
    pub(crate) fn prune_dead(&mut self, dom: &Dom) {
        self.initialized.retain(|el, _| dom.is_alive(el));
    }

    // -- active table --------------------------------------------------------

    /// Start an add episode. Returns `false` if the pair is already active or
    /// the observer is gone.
    pub(crate) fn activate(&mut self, el: NodeId, id: ObserverId) -> bool {
        let Some(record) = self.observers.get_mut(&id) else {
            return false;
        };
        let entry = self.active.entry_or_default(el);
        if entry.ids.contains(&id) {
            return false;
        }
        entry.ids.push(id);
        record.elements.push(el);
        true
    }

    /// End an add episode. `None` if the pair was not active.
    pub(crate) fn deactivate(&mut self, el: NodeId, id: ObserverId) -> Option<Deactivated> {
        let entry = self.active.get_mut(el)?;
        let pos = entry.ids.iter().position(|&i| i == id)?;
        entry.ids.remove(pos);
        let subscription = entry
            .subscriptions
            .iter()
            .position(|(i, _)| *i == id)
            .map(|p| entry.subscriptions.remove(p).1);
        if entry.ids.is_empty() {
            self.active.remove(el);
        }
        if let Some(record) = self.observers.get_mut(&id) {
            record.elements.retain(|&e| e != el);
        }
        Some(Deactivated {
            initializer: self.initializer(el, id),
            subscription,
        })
    }

    /// Attach a subscription to an active pair. If the pair stopped being
    /// active while the subscribe handler ran, the subscription is handed
    /// back so the caller can tear it down.
    pub(crate) fn store_subscription(
        &mut self,
        el: NodeId,
        id: ObserverId,
        subscription: Subscription,
    ) -> Option<Subscription> {
        match self.active.get_mut(el) {
            Some(entry) if entry.ids.contains(&id) => {
                entry.subscriptions.push((id, subscription));
                None
            }
            _ => Some(subscription),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self, el: NodeId, id: ObserverId) -> bool {
        self.active.get(el).is_some_and(|e| e.ids.contains(&id))
    }

    /// Observers active on `el`, in the order they were added.
    pub(crate) fn active_ids(&self, el: NodeId) -> Vec<ObserverId> {
        self.active.get(el).map(|e| e.ids.clone()).unwrap_or_default()
    }

    /// Drop all active state of `el`, returning subscriptions that were still
    /// attached.
    pub(crate) fn release(&mut self, el: NodeId) -> Vec<Subscription> {
        let Some(entry) = self.active.remove(el) else {
            return Vec::new();
        };
        for id in &entry.ids {
            if let Some(record) = self.observers.get_mut(id) {
                record.elements.retain(|&e| e != el);
            }
        }
        entry.subscriptions.into_iter().map(|(_, s)| s).collect()
    }

    pub(crate) fn tracked_elements(&self) -> usize {
        self.active.len()
    }
}

/// Handle returned from [`crate::Watcher::observe`].
///
/// Dropping the handle does not stop the observer; call [`Observer::abort`].
#[derive(Clone)]
pub struct Observer {
    id: ObserverId,
    selector: String,
    shared: Weak<Shared>,
}

impl Observer {
    pub(crate) fn new(id: ObserverId, selector: String, shared: Weak<Shared>) -> Self {
        Self { id, selector, shared }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Run `remove` for every element currently added, then deregister.
    /// Later calls do nothing.
    pub fn abort(&self) {
        if let Some(shared) = self.shared.upgrade() {
            crate::apply::abort_observer(&shared, self.id);
        }
    }

    /// Same as [`Observer::abort`].
    pub fn stop(&self) {
        self.abort();
    }

    pub fn is_active(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.engine.borrow().contains(self.id))
    }

    /// Elements currently added, in add order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.shared
            .upgrade()
            .map(|shared| shared.engine.borrow().elements(self.id))
            .unwrap_or_default()
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("selector", &self.selector)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom_with(n: usize) -> (Dom, Vec<NodeId>) {
        let mut dom = Dom::new();
        let els = (0..n).map(|_| dom.create_html_element("div")).collect();
        (dom, els)
    }

    #[test]
    fn ids_are_monotonic() {
        let mut engine = Engine::new();
        let a = engine.register("div", Handlers::new()).unwrap();
        let b = engine.register("div", Handlers::new()).unwrap();
        assert!(b > a);
        assert_eq!(engine.observer_ids(), vec![a, b]);
    }

    #[test]
    fn invalid_selector_registers_nothing() {
        let mut engine = Engine::new();
        assert!(engine.register("[", Handlers::new()).is_err());
        assert!(engine.observers.is_empty());
        assert!(engine.selector_set.is_empty());
    }

    #[test]
    fn initialized_is_sticky() {
        let (_dom, els) = dom_with(1);
        let mut engine = Engine::new();
        let id = engine.register("div", Handlers::new()).unwrap();
        assert!(engine.mark_initialized(els[0], id));
        assert!(!engine.mark_initialized(els[0], id));

        assert!(engine.activate(els[0], id));
        assert!(engine.deactivate(els[0], id).is_some());
        assert!(engine.is_initialized(els[0], id));
    }

    #[test]
    fn activate_and_deactivate_alternate() {
        let (_dom, els) = dom_with(2);
        let mut engine = Engine::new();
        let id = engine.register("div", Handlers::new()).unwrap();

        assert!(engine.activate(els[0], id));
        assert!(!engine.activate(els[0], id));
        assert!(engine.activate(els[1], id));
        assert_eq!(engine.elements(id), vec![els[0], els[1]]);

        assert!(engine.deactivate(els[0], id).is_some());
        assert!(engine.deactivate(els[0], id).is_none());
        assert_eq!(engine.elements(id), vec![els[1]]);
        assert_eq!(engine.tracked_elements(), 1);
    }

    #[test]
    fn active_ids_keep_add_order() {
        let (_dom, els) = dom_with(1);
        let mut engine = Engine::new();
        let a = engine.register("div", Handlers::new()).unwrap();
        let b = engine.register("div", Handlers::new()).unwrap();
        engine.activate(els[0], b);
        engine.activate(els[0], a);
        assert_eq!(engine.active_ids(els[0]), vec![b, a]);

        engine.release(els[0]);
        assert!(engine.active_ids(els[0]).is_empty());
        assert!(engine.elements(a).is_empty());
        assert!(engine.elements(b).is_empty());
    }

    #[test]
    fn deregister_clears_active_state() {
        let (_dom, els) = dom_with(1);
        let mut engine = Engine::new();
        let id = engine.register(".x", Handlers::new()).unwrap();
        engine.activate(els[0], id);
        assert!(engine.deregister(id));
        assert!(!engine.is_active(els[0], id));
        assert_eq!(engine.tracked_elements(), 0);
        assert!(engine.selector_set.is_empty());
        assert!(!engine.deregister(id));
    }

    #[test]
    fn subscription_for_inactive_pair_is_returned() {
        let (_dom, els) = dom_with(1);
        let mut engine = Engine::new();
        let id = engine.register("div", Handlers::new()).unwrap();
        assert!(engine.store_subscription(els[0], id, Subscription::empty()).is_some());

        engine.activate(els[0], id);
        assert!(engine.store_subscription(els[0], id, Subscription::empty()).is_none());
        let gone = engine.deactivate(els[0], id).unwrap();
        assert!(gone.subscription.is_some());
    }

    #[test]
    fn dead_elements_are_pruned() {
        let (mut dom, els) = dom_with(2);
        let mut engine = Engine::new();
        let id = engine.register("div", Handlers::new()).unwrap();
        engine.mark_initialized(els[0], id);
        engine.mark_initialized(els[1], id);
        dom.destroy(els[0]);
        engine.prune_dead(&dom);
        assert!(!engine.is_initialized(els[0], id));
        assert!(engine.is_initialized(els[1], id));
    }
}
