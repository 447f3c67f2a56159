//! Declarative hooks for elements that start or stop matching a CSS selector.
//!
//! ```ignore
//! use selector_observer::{observe, Handlers};
//!
//! let observer = observe(".js-foo", Handlers::new()
//!     .on_add(|el| { println!("{el:?} matched"); Ok(()) })
//!     .on_remove(|el| { println!("{el:?} stopped matching"); Ok(()) }))?;
//! selector_observer::event_loop().run_until_idle();
//! observer.abort();
//! ```
//!
//! The free functions use a per-thread default [`Watcher`] over a per-thread
//! default [`Document`], both created on first use. Build a [`Watcher`]
//! directly to watch another document or any subtree root.

use std::cell::RefCell;

pub use anyhow;

pub use dom::{BulkRemoval, Document, NodeId, ShadowRootMode};
pub use observer::{
    Change, ConfigError, ElementFilter, HandlerError, Handlers, Initializer, ObserveArgs, ObserveError,
    Observer, ObserverId, OrphanSweep, Phase, Subscription, Watcher, WatcherConfig, bulk_removal_is_buggy,
};
pub use scheduler::{EventLoop, Trigger, schedule_batch};
pub use selector_set::SelectorSet;

thread_local! {
    static DOCUMENT: Document = Document::new();
    static EVENT_LOOP: EventLoop = EventLoop::new();
    static WATCHER: RefCell<Option<Watcher>> = const { RefCell::new(None) };
}

/// The per-thread default document.
pub fn document() -> Document {
    DOCUMENT.with(Document::clone)
}

/// The event loop driving the default watcher.
pub fn event_loop() -> EventLoop {
    EVENT_LOOP.with(EventLoop::clone)
}

/// The default watcher over [`document()`], created on first use.
pub fn default_watcher() -> Result<Watcher, ObserveError> {
    WATCHER.with(|slot| {
        if let Some(watcher) = slot.borrow().as_ref() {
            return Ok(watcher.clone());
        }
        let watcher = Watcher::for_document(&document(), &event_loop())?;
        *slot.borrow_mut() = Some(watcher.clone());
        Ok(watcher)
    })
}

/// Register `handlers` for `selector` on the default watcher.
pub fn observe(selector: &str, handlers: Handlers) -> Result<Observer, ObserveError> {
    default_watcher()?.observe(selector, handlers)
}

/// [`observe`] taking any of the accepted argument shapes.
pub fn observe_args(args: impl Into<ObserveArgs>) -> Result<Observer, ObserveError> {
    default_watcher()?.observe_args(args)
}

/// Re-check `container` on the default watcher.
pub fn trigger_observers(container: NodeId) -> Result<(), ObserveError> {
    default_watcher()?.trigger_observers(container);
    Ok(())
}
