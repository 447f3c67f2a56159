//! # Observer Crate
//!
//! Selector-based lifecycle hooks over a live [`dom::Document`].
//!
//! A [`Watcher`] owns one subtree root. Each [`Watcher::observe`] call
//! registers a selector with a set of [`Handlers`]; the watcher then reports,
//! exactly once per transition, when an element under the root starts or
//! stops matching that selector.
//!
//! Work happens in two phases. Mutation records (or a full scan of the root)
//! are first turned into an ordered list of [`Change`]s without running any
//! user code; the list is then applied, which is where `initialize`, `add`
//! and `remove` run. Handler failures never interrupt an apply pass: they are
//! reported on a later tick through the watcher's error sink.

#![forbid(unsafe_code)]

mod apply;
mod changes;
mod config;
mod error;
mod handlers;
mod registry;
mod support;
mod watcher;

pub use changes::Change;
pub use config::{OrphanSweep, WatcherConfig};
pub use error::{ConfigError, HandlerError, ObserveError, Phase};
pub use handlers::{ElementFilter, Handlers, Initializer, ObserveArgs, Subscription};
pub use registry::{Observer, ObserverId};
pub use support::{bulk_removal_is_buggy, supports_selector_matching};
pub use watcher::Watcher;
