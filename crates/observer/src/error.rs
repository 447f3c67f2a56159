//! Error types for the observer engine

use std::fmt;

use dom::NodeId;
use selector_set::SelectorSetError;
use thiserror::Error;

use crate::registry::ObserverId;

/// Registration and construction failures. These are returned synchronously
/// from the call that caused them.
#[derive(Error, Debug)]
pub enum ObserveError {
    #[error("{0}")]
    InvalidSelector(#[from] SelectorSetError),

    #[error("observer for `{0}` has no handlers")]
    MissingHandlers(String),

    #[error("watcher root {0:?} is not an element, document or shadow root")]
    InvalidRoot(NodeId),

    #[error("watcher has been disposed")]
    Disposed,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid watcher config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which user callback failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Initialize,
    Add,
    Remove,
    Subscribe,
    Unsubscribe,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initialize => "initialize",
            Phase::Add => "add",
            Phase::Remove => "remove",
            Phase::Subscribe => "subscribe",
            Phase::Unsubscribe => "unsubscribe",
        };
        f.write_str(name)
    }
}

/// A handler returned `Err` or panicked.
///
/// Delivered to the watcher's error sink on a macrotask after the apply pass
/// that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{phase} handler of observer {observer} (`{selector}`) failed on {element:?}: {message}")]
pub struct HandlerError {
    pub observer: ObserverId,
    pub selector: String,
    pub phase: Phase,
    pub element: NodeId,
    pub message: String,
}
