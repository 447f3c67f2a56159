//! Change application.
//!
//! Every step follows the same pattern: update the [`Engine`] tables under a
//! short borrow, copy out the callbacks to run, drop the borrow, run them.
//! Callbacks are therefore free to call back into the watcher.
//!
//! [`Engine`]: crate::registry::Engine

use std::panic::{self, AssertUnwindSafe};

use dom::NodeId;
use tracing::trace;

use crate::changes::Change;
use crate::error::{HandlerError, Phase};
use crate::handlers::Subscription;
use crate::registry::ObserverId;
use crate::watcher::Shared;

pub(crate) fn apply_changes(shared: &Shared, changes: Vec<Change>) {
    for change in changes {
        trace!(?change, "applying change");
        match change {
            Change::Add(el, id) => run_add(shared, el, id),
            Change::Remove(el, id) => run_remove(shared, el, id),
            Change::RemoveSubtree(el) => run_remove_all(shared, el),
        }
    }
}

fn run_add(shared: &Shared, el: NodeId, id: ObserverId) {
    let Some((selector, handlers)) = shared.engine.borrow().observer_parts(id) else {
        return;
    };
    if !handlers.filter.accepts(&shared.document.dom(), el) {
        return;
    }

    let first_match = shared.engine.borrow_mut().mark_initialized(el, id);
    if first_match {
        if let Some(initialize) = &handlers.initialize {
            let result = guarded(shared, id, &selector, Phase::Initialize, el, || initialize(el));
            if let Some(Some(initializer)) = result {
                shared.engine.borrow_mut().store_initializer(el, id, initializer);
            }
        }
    }

    if !shared.engine.borrow_mut().activate(el, id) {
        return;
    }
    let initializer = shared.engine.borrow().initializer(el, id);
    if let Some(add) = initializer.and_then(|i| i.add) {
        guarded(shared, id, &selector, Phase::Add, el, || add(el));
    }
    if let Some(add) = &handlers.add {
        guarded(shared, id, &selector, Phase::Add, el, || add(el));
    }
    if let Some(subscribe) = &handlers.subscribe {
        if let Some(subscription) = guarded(shared, id, &selector, Phase::Subscribe, el, || subscribe(el)) {
            let stale = shared.engine.borrow_mut().store_subscription(el, id, subscription);
            if let Some(stale) = stale {
                unsubscribe(shared, id, &selector, el, stale);
            }
        }
    }
}

pub(crate) fn run_remove(shared: &Shared, el: NodeId, id: ObserverId) {
    let Some((selector, handlers)) = shared.engine.borrow().observer_parts(id) else {
        return;
    };
    let Some(done) = shared.engine.borrow_mut().deactivate(el, id) else {
        return;
    };
    if let Some(remove) = done.initializer.and_then(|i| i.remove) {
        guarded(shared, id, &selector, Phase::Remove, el, || remove(el));
    }
    if let Some(remove) = &handlers.remove {
        guarded(shared, id, &selector, Phase::Remove, el, || remove(el));
    }
    if let Some(subscription) = done.subscription {
        unsubscribe(shared, id, &selector, el, subscription);
    }
}

fn run_remove_all(shared: &Shared, el: NodeId) {
    let ids = shared.engine.borrow().active_ids(el);
    for id in ids {
        run_remove(shared, el, id);
    }
    let leftovers = shared.engine.borrow_mut().release(el);
    for subscription in leftovers {
        subscription.unsubscribe();
    }
}

/// Remove the observer from every element it is added to, then deregister it.
pub(crate) fn abort_observer(shared: &Shared, id: ObserverId) {
    let elements = shared.engine.borrow().elements(id);
    for el in elements {
        run_remove(shared, el, id);
    }
    if shared.engine.borrow_mut().deregister(id) {
        trace!(observer = %id, "observer aborted");
    }
}

fn unsubscribe(shared: &Shared, id: ObserverId, selector: &str, el: NodeId, subscription: Subscription) {
    guarded(shared, id, selector, Phase::Unsubscribe, el, || {
        subscription.unsubscribe();
        Ok(())
    });
}

/// Run one user callback. An `Err` or a panic is reported later and turns
/// into `None`; it never escapes into the apply loop.
fn guarded<T>(
    shared: &Shared,
    observer: ObserverId,
    selector: &str,
    phase: Phase,
    element: NodeId,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> Option<T> {
    let message = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(err)) => format!("{err:#}"),
        Err(payload) => panic_message(payload.as_ref()),
    };
    shared.report(HandlerError {
        observer,
        selector: selector.to_string(),
        phase,
        element,
        message,
    });
    None
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "panicked: boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "panicked: bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "panicked");
    }
}
