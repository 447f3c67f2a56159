//! Coalescing of synchronous bursts into one macrotask.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use crate::EventLoop;

struct BatchState<T> {
    pending: RefCell<Vec<T>>,
    handler: RefCell<Box<dyn FnMut(Vec<T>)>>,
    event_loop: EventLoop,
    /// Bumped by `cancel`; flush tasks posted under an older epoch do nothing.
    epoch: Cell<u64>,
}

impl<T: 'static> BatchState<T> {
    fn flush(&self, epoch: u64) {
        if epoch != self.epoch.get() {
            return;
        }
        // Swap in a fresh queue first: the handler may call the trigger again,
        // and those calls belong to the next batch.
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        if batch.is_empty() {
            return;
        }
        trace!(calls = batch.len(), "flushing batch");
        (self.handler.borrow_mut())(batch);
    }
}

/// Callable returned by [`schedule_batch`].
pub struct Trigger<T> {
    state: Rc<BatchState<T>>,
}

impl<T> Clone for Trigger<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: 'static> Trigger<T> {
    /// Queue `arg`. The first call since the last flush posts the flush task.
    pub fn call(&self, arg: T) {
        let first = {
            let mut pending = self.state.pending.borrow_mut();
            pending.push(arg);
            pending.len() == 1
        };
        if first {
            let state = self.state.clone();
            let epoch = state.epoch.get();
            self.state.event_loop.post_task(move || state.flush(epoch));
        }
    }

    /// Drop queued calls without running the handler. A flush task already
    /// posted is skipped; the next call posts a fresh one.
    pub fn cancel(&self) {
        self.state.pending.borrow_mut().clear();
        self.state.epoch.set(self.state.epoch.get() + 1);
    }

    pub fn pending(&self) -> usize {
        self.state.pending.borrow().len()
    }
}

/// Wrap `handler` so that every [`Trigger::call`] made before the next
/// macrotask is delivered to a single `handler` invocation, in call order.
pub fn schedule_batch<T: 'static>(event_loop: &EventLoop, handler: impl FnMut(Vec<T>) + 'static) -> Trigger<T> {
    Trigger {
        state: Rc::new(BatchState {
            pending: RefCell::new(Vec::new()),
            handler: RefCell::new(Box::new(handler)),
            event_loop: event_loop.clone(),
            epoch: Cell::new(0),
        }),
    }
}
