//! # Scheduler Crate
//!
//! Single-threaded event loop with macro/micro task queues, modeled after the
//! HTML event loop, and [`schedule_batch`] for coalescing bursts of calls into
//! one deferred invocation.
//!
//! [`EventLoop`] is a cheap `Rc` handle: clones share the same queues, so
//! callbacks can post further work while the loop is running.

#![forbid(unsafe_code)]

mod batch;

pub use batch::{schedule_batch, Trigger};

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{trace, warn};

/// Opaque identifier for a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Upper bound on ticks per [`EventLoop::run_until_idle`] call. A loop that
/// keeps rescheduling itself stops here instead of spinning forever.
pub const MAX_IDLE_TICKS: usize = 100_000;

#[derive(Default)]
struct Queues {
    macro_queue: RefCell<VecDeque<(TaskId, Task)>>,
    micro_queue: RefCell<VecDeque<(TaskId, Task)>>,
    next_task_id: Cell<u64>,
}

impl Queues {
    fn alloc_task_id(&self) -> TaskId {
        let id = self.next_task_id.get();
        self.next_task_id.set(id + 1);
        TaskId(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Each call to [`tick`](EventLoop::tick) runs:
/// 1. One macro-task, if any is queued.
/// 2. All pending micro-tasks, including those queued while draining.
///
/// No queue borrow is held while a task runs.
#[derive(Clone, Default)]
pub struct EventLoop {
    queues: Rc<Queues>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a macro-task.
    pub fn post_task(&self, task: impl FnOnce() + 'static) -> TaskId {
        let id = self.queues.alloc_task_id();
        self.queues
            .macro_queue
            .borrow_mut()
            .push_back((id, Box::new(task)));
        id
    }

    /// Enqueue a micro-task; it runs at the next checkpoint, before the next
    /// macro-task.
    pub fn post_microtask(&self, task: impl FnOnce() + 'static) -> TaskId {
        let id = self.queues.alloc_task_id();
        self.queues
            .micro_queue
            .borrow_mut()
            .push_back((id, Box::new(task)));
        id
    }

    /// Advance the event loop by one tick. Returns `false` if there was
    /// nothing to do.
    pub fn tick(&self) -> bool {
        let next = self.queues.macro_queue.borrow_mut().pop_front();
        let ran_macro = match next {
            Some((id, task)) => {
                trace!(task = id.0, "running macrotask");
                task();
                true
            }
            None => false,
        };
        let ran_micro = self.perform_microtask_checkpoint();
        ran_macro || ran_micro > 0
    }

    /// Run micro-tasks until the queue is empty. Returns how many ran.
    pub fn perform_microtask_checkpoint(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queues.micro_queue.borrow_mut().pop_front();
            let Some((id, task)) = next else {
                return ran;
            };
            trace!(task = id.0, "running microtask");
            task();
            ran += 1;
        }
    }

    /// Tick until no work is left. Returns the number of ticks taken.
    pub fn run_until_idle(&self) -> usize {
        let mut ticks = 0;
        while self.has_pending_work() {
            if ticks == MAX_IDLE_TICKS {
                warn!(
                    ticks,
                    pending_macro = self.macro_queue_len(),
                    pending_micro = self.micro_queue_len(),
                    "event loop did not go idle; giving up"
                );
                break;
            }
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn has_pending_work(&self) -> bool {
        self.macro_queue_len() > 0 || self.micro_queue_len() > 0
    }

    pub fn macro_queue_len(&self) -> usize {
        self.queues.macro_queue.borrow().len()
    }

    pub fn micro_queue_len(&self) -> usize {
        self.queues.micro_queue.borrow().len()
    }

    /// `true` if both handles drive the same queues.
    pub fn ptr_eq(&self, other: &EventLoop) -> bool {
        Rc::ptr_eq(&self.queues, &other.queues)
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("macro_queue", &self.macro_queue_len())
            .field("micro_queue", &self.micro_queue_len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
