//! The watcher: one root, one selector index, one set of membership tables.
//!
//! Three inputs feed the engine, each coalesced before it is processed:
//!
//! 1. Mutation records from the document, delivered on a microtask after the
//!    first record of a burst is queued.
//! 2. `change` events bubbling to the root, batched per macrotask through
//!    [`schedule_batch`].
//! 3. New registrations, which schedule one batched scan of the root.
//!
//! Records produced by handlers while a batch is being applied stay queued
//! and are delivered as the next batch.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use dom::{Document, ListenerId, MutationObserverId, MutationObserverInit, NodeData, NodeId};
use scheduler::{EventLoop, Trigger, schedule_batch};
use tracing::{debug, error};

use crate::apply::{abort_observer, apply_changes};
use crate::changes::{self, Change};
use crate::config::WatcherConfig;
use crate::error::{HandlerError, ObserveError};
use crate::handlers::{Handlers, ObserveArgs};
use crate::registry::{Engine, Observer, ObserverId};

type ErrorSink = Rc<dyn Fn(&HandlerError)>;

fn default_sink() -> ErrorSink {
    Rc::new(|err: &HandlerError| error!(%err, "selector observer handler failed"))
}

pub(crate) struct Shared {
    pub(crate) document: Document,
    pub(crate) event_loop: EventLoop,
    pub(crate) engine: RefCell<Engine>,
    root: NodeId,
    config: WatcherConfig,
    error_sink: RefCell<ErrorSink>,
    mutation_observer: MutationObserverId,
    change_listener: Cell<Option<ListenerId>>,
    scan_root: Trigger<()>,
    changed_targets: Trigger<NodeId>,
    connected: Cell<bool>,
    disposed: Cell<bool>,
}

impl Shared {
    /// Hand `err` to the error sink on a later macrotask.
    pub(crate) fn report(&self, err: HandlerError) {
        let sink = self.error_sink.borrow().clone();
        self.event_loop.post_task(move || sink(&err));
    }

    fn scan(&self) {
        let changes = {
            let dom = self.document.dom();
            let engine = self.engine.borrow();
            let mut changes = Vec::new();
            changes::add_nodes(&engine, &dom, &[self.root], &mut changes);
            changes
        };
        debug!(changes = changes.len(), "scanned root");
        apply_changes(self, changes);
    }

    fn deliver_mutations(&self) {
        let records = self.document.dom_mut().mutations.take_records(self.mutation_observer);
        if records.is_empty() {
            return;
        }
        let sweep_detached = self.config.sweeps_detached(self.document.dom().bulk_removal());
        let changes = {
            let dom = self.document.dom();
            let mut engine = self.engine.borrow_mut();
            let changes = changes::handle_mutations(&engine, &dom, self.root, &records, sweep_detached);
            engine.prune_dead(&dom);
            changes
        };
        apply_changes(self, changes);
    }

    fn revalidate_inputs(&self, targets: Vec<NodeId>) {
        let changes = {
            let dom = self.document.dom();
            let engine = self.engine.borrow();
            let mut changes = Vec::new();
            changes::revalidate_inputs(&engine, &dom, self.root, &targets, &mut changes);
            changes
        };
        debug!(targets = targets.len(), changes = changes.len(), "revalidated form controls");
        apply_changes(self, changes);
    }

    fn detach_sources(&self) {
        if self.connected.replace(false) {
            self.document.dom_mut().mutations.disconnect(self.mutation_observer);
        }
        if let Some(listener) = self.change_listener.take() {
            self.document.remove_event_listener(self.root, listener);
        }
        self.scan_root.cancel();
        self.changed_targets.cancel();
    }
}

/// Watches one subtree of a [`Document`].
///
/// Cloning yields another handle to the same watcher. Once the last handle
/// is dropped nothing is delivered any more; no `remove` runs for elements
/// still added.
#[derive(Clone)]
pub struct Watcher {
    shared: Rc<Shared>,
}

impl Watcher {
    /// Watch `root`, which must be a live element, document or shadow root.
    /// A document root watches its document element.
    pub fn new(document: &Document, event_loop: &EventLoop, root: NodeId) -> Result<Self, ObserveError> {
        Self::with_config(document, event_loop, root, WatcherConfig::default())
    }

    /// Watch the whole document.
    pub fn for_document(document: &Document, event_loop: &EventLoop) -> Result<Self, ObserveError> {
        Self::new(document, event_loop, document.node())
    }

    pub fn with_config(
        document: &Document,
        event_loop: &EventLoop,
        root: NodeId,
        config: WatcherConfig,
    ) -> Result<Self, ObserveError> {
        let root = resolve_root(document, root)?;

        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            // Runs while the tree is mutably borrowed; it only posts.
            let notify_weak = weak.clone();
            let notify_loop = event_loop.clone();
            let notify: Rc<dyn Fn()> = Rc::new(move || {
                let weak = notify_weak.clone();
                notify_loop.post_microtask(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.deliver_mutations();
                    }
                });
            });
            let mutation_observer = document.dom_mut().mutations.register(Some(notify));

            let scan_weak = weak.clone();
            let scan_root = schedule_batch(event_loop, move |_: Vec<()>| {
                if let Some(shared) = scan_weak.upgrade() {
                    shared.scan();
                }
            });
            let change_weak = weak.clone();
            let changed_targets = schedule_batch(event_loop, move |targets: Vec<NodeId>| {
                if let Some(shared) = change_weak.upgrade() {
                    shared.revalidate_inputs(targets);
                }
            });
            Shared {
                document: document.clone(),
                event_loop: event_loop.clone(),
                engine: RefCell::new(Engine::new()),
                root,
                config,
                error_sink: RefCell::new(default_sink()),
                mutation_observer,
                change_listener: Cell::new(None),
                scan_root,
                changed_targets,
                connected: Cell::new(false),
                disposed: Cell::new(false),
            }
        });

        let watcher = Watcher { shared };
        watcher.connect();
        Ok(watcher)
    }

    /// Start (or resume) listening for mutations and change events, and
    /// schedule a scan of the root.
    pub fn connect(&self) {
        let shared = &self.shared;
        if shared.disposed.get() || shared.connected.replace(true) {
            return;
        }
        let init = MutationObserverInit {
            child_list: true,
            attributes: shared.config.attributes,
            subtree: true,
            attribute_filter: shared.config.attribute_filter.clone(),
            attribute_old_value: false,
        };
        shared
            .document
            .dom_mut()
            .mutations
            .observe(shared.mutation_observer, shared.root, init);

        if shared.config.change_events {
            let weak = Rc::downgrade(shared);
            let listener = shared.document.add_event_listener(
                shared.root,
                &shared.config.change_event_type,
                false,
                move |event| {
                    if let (Some(shared), Some(target)) = (weak.upgrade(), event.target) {
                        shared.changed_targets.call(target);
                    }
                },
            );
            shared.change_listener.set(Some(listener));
        }
        // Matches that appeared while disconnected produced no records.
        shared.scan_root.call(());
        debug!(root = ?shared.root, "watcher connected");
    }

    /// Stop listening. Observers stay registered and keep their elements.
    pub fn disconnect(&self) {
        self.shared.detach_sources();
        debug!(root = ?self.shared.root, "watcher disconnected");
    }

    /// Disconnect, then abort every observer. The watcher rejects new
    /// observers afterwards.
    pub fn dispose(&self) {
        if self.shared.disposed.replace(true) {
            return;
        }
        self.shared.detach_sources();
        let ids = self.shared.engine.borrow().observer_ids();
        for id in ids {
            abort_observer(&self.shared, id);
        }
        self.shared
            .document
            .dom_mut()
            .mutations
            .unregister(self.shared.mutation_observer);
        debug!(root = ?self.shared.root, "watcher disposed");
    }

    /// Register `handlers` for `selector`. The root is scanned on the next
    /// macrotask, so elements already in the tree are reported too.
    pub fn observe(&self, selector: &str, handlers: Handlers) -> Result<Observer, ObserveError> {
        if self.shared.disposed.get() {
            return Err(ObserveError::Disposed);
        }
        if handlers.is_empty() {
            return Err(ObserveError::MissingHandlers(selector.to_string()));
        }
        let id = self.shared.engine.borrow_mut().register(selector, handlers)?;
        debug!(observer = %id, selector, "observer registered");
        self.shared.scan_root.call(());
        Ok(Observer::new(id, selector.to_string(), Rc::downgrade(&self.shared)))
    }

    /// [`Watcher::observe`] taking any of the accepted argument shapes.
    pub fn observe_args(&self, args: impl Into<ObserveArgs>) -> Result<Observer, ObserveError> {
        let (selector, handlers) = args.into().into_parts();
        self.observe(&selector, handlers)
    }

    /// Re-check `container` and everything below it right now, for changes
    /// that produced no mutation record.
    pub fn trigger_observers(&self, container: NodeId) {
        let changes = {
            let dom = self.shared.document.dom();
            let engine = self.shared.engine.borrow();
            let mut changes = Vec::new();
            changes::revalidate_descendants(&engine, &dom, container, &mut changes);
            changes
        };
        apply_changes(&self.shared, changes);
    }

    /// Apply an externally computed change list.
    pub fn apply(&self, changes: Vec<Change>) {
        apply_changes(&self.shared, changes);
    }

    /// Replace the sink that receives handler failures.
    pub fn set_error_handler(&self, sink: impl Fn(&HandlerError) + 'static) {
        *self.shared.error_sink.borrow_mut() = Rc::new(sink);
    }

    pub fn root(&self) -> NodeId {
        self.shared.root
    }

    pub fn document(&self) -> &Document {
        &self.shared.document
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.shared.event_loop
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.shared.config
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }

    pub fn observer_ids(&self) -> Vec<ObserverId> {
        self.shared.engine.borrow().observer_ids()
    }

    /// Observers currently added on `el`, in the order they were added.
    pub fn active_observers(&self, el: NodeId) -> Vec<ObserverId> {
        self.shared.engine.borrow().active_ids(el)
    }

    /// Elements with at least one active observer.
    pub fn tracked_elements(&self) -> usize {
        self.shared.engine.borrow().tracked_elements()
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("root", &self.shared.root)
            .field("observers", &self.shared.engine.borrow().observers.len())
            .field("connected", &self.shared.connected.get())
            .finish()
    }
}

fn resolve_root(document: &Document, root: NodeId) -> Result<NodeId, ObserveError> {
    let dom = document.dom();
    let node = dom.nodes.get(root).ok_or(ObserveError::InvalidRoot(root))?;
    match node.data {
        NodeData::Element(_) | NodeData::ShadowRoot { .. } => Ok(root),
        NodeData::Document => dom.document_element(root).ok_or(ObserveError::InvalidRoot(root)),
        _ => Err(ObserveError::InvalidRoot(root)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn setup() -> (Document, EventLoop, NodeId) {
        let doc = Document::new();
        let body = doc.body().unwrap();
        (doc, EventLoop::new(), body)
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Handlers) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &str| {
            let (a, r) = (sink.clone(), sink.clone());
            let (na, nr) = (format!("add {name}"), format!("remove {name}"));
            Handlers::new()
                .on_add(move |_| {
                    a.borrow_mut().push(na.clone());
                    Ok(())
                })
                .on_remove(move |_| {
                    r.borrow_mut().push(nr.clone());
                    Ok(())
                })
        };
        (log, make)
    }

    #[test]
    fn document_root_resolves_to_document_element() {
        let (doc, el, _) = setup();
        let watcher = Watcher::for_document(&doc, &el).unwrap();
        assert_eq!(Some(watcher.root()), doc.document_element());
    }

    #[test]
    fn invalid_roots_are_rejected() {
        let (doc, el, body) = setup();
        let text = doc.dom_mut().create_text("x");
        assert!(matches!(Watcher::new(&doc, &el, text), Err(ObserveError::InvalidRoot(_))));

        doc.dom_mut().destroy(body);
        assert!(matches!(Watcher::new(&doc, &el, body), Err(ObserveError::InvalidRoot(_))));
    }

    #[test]
    fn registration_misuse_fails_fast() {
        let (doc, el, body) = setup();
        let watcher = Watcher::new(&doc, &el, body).unwrap();
        assert!(matches!(
            watcher.observe("div", Handlers::new()),
            Err(ObserveError::MissingHandlers(_))
        ));
        assert!(matches!(
            watcher.observe("", Handlers::new().on_add(|_| Ok(()))),
            Err(ObserveError::InvalidSelector(_))
        ));
        assert!(watcher.observer_ids().is_empty());
    }

    #[test]
    fn existing_elements_are_found_by_the_scan() {
        let (doc, el, body) = setup();
        let div = doc.create_element("div", &[("class", "foo")]);
        doc.append_child(body, div);

        let watcher = Watcher::new(&doc, &el, body).unwrap();
        let (log, make) = recorder();
        let observer = watcher.observe(".foo", make("foo")).unwrap();
        assert!(log.borrow().is_empty());

        el.run_until_idle();
        assert_eq!(*log.borrow(), vec!["add foo"]);
        assert_eq!(observer.elements(), vec![div]);
    }

    #[test]
    fn abort_runs_pending_removes() {
        let (doc, el, body) = setup();
        let watcher = Watcher::new(&doc, &el, body).unwrap();
        let (log, make) = recorder();
        let observer = watcher.observe("p", make("p")).unwrap();
        let p = doc.create_element("p", &[]);
        doc.append_child(body, p);
        el.run_until_idle();

        observer.abort();
        assert_eq!(*log.borrow(), vec!["add p", "remove p"]);
        assert!(!observer.is_active());
        assert_eq!(watcher.tracked_elements(), 0);

        observer.abort();
        doc.remove(p);
        el.run_until_idle();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn disconnect_stops_delivery_and_connect_resumes() {
        let (doc, el, body) = setup();
        let watcher = Watcher::new(&doc, &el, body).unwrap();
        let (log, make) = recorder();
        watcher.observe("span", make("span")).unwrap();
        el.run_until_idle();

        watcher.disconnect();
        assert!(!watcher.is_connected());
        let span = doc.create_element("span", &[]);
        doc.append_child(body, span);
        el.run_until_idle();
        assert!(log.borrow().is_empty());

        watcher.connect();
        assert!(log.borrow().is_empty());
        el.run_until_idle();
        assert_eq!(*log.borrow(), vec!["add span"]);
    }

    #[test]
    fn reconnect_rescans_for_pending_registrations() {
        let (doc, el, body) = setup();
        let div = doc.create_element("div", &[("class", "foo")]);
        doc.append_child(body, div);
        let watcher = Watcher::new(&doc, &el, body).unwrap();
        let (log, make) = recorder();
        watcher.observe(".foo", make("foo")).unwrap();

        watcher.disconnect();
        watcher.connect();
        el.run_until_idle();
        assert_eq!(*log.borrow(), vec!["add foo"]);
    }

    #[test]
    fn dispose_aborts_everything() {
        let (doc, el, body) = setup();
        let watcher = Watcher::new(&doc, &el, body).unwrap();
        let (log, make) = recorder();
        watcher.observe("div", make("div")).unwrap();
        let div = doc.create_element("div", &[]);
        doc.append_child(body, div);
        el.run_until_idle();

        watcher.dispose();
        assert_eq!(*log.borrow(), vec!["add div", "remove div"]);
        assert!(watcher.is_disposed());
        assert!(matches!(
            watcher.observe("div", make("again")),
            Err(ObserveError::Disposed)
        ));
    }

    #[test]
    fn handler_errors_reach_the_sink_later() {
        let (doc, el, body) = setup();
        let watcher = Watcher::new(&doc, &el, body).unwrap();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        watcher.set_error_handler(move |err| sink.borrow_mut().push(err.clone()));
        watcher
            .observe("div", Handlers::new().on_add(|_| anyhow::bail!("nope")))
            .unwrap();
        let div = doc.create_element("div", &[]);
        doc.append_child(body, div);

        // deliver the mutation batch only
        el.perform_microtask_checkpoint();
        assert!(errors.borrow().is_empty());

        el.run_until_idle();
        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].phase, crate::Phase::Add);
        assert_eq!(errors[0].element, div);
        assert_eq!(errors[0].message, "nope");
    }
}
