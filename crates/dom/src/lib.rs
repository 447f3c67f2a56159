//! DOM crate: Document Object Model
//!
//! Arena-based DOM tree with mutation records and event dispatch.
//! Nodes live in a generational arena; [`Document`] shares one tree per thread.

pub mod document;
pub mod event;
pub mod mutation;
pub mod node;
pub mod tree;

pub use document::Document;
pub use event::*;
pub use mutation::{MutationObserverId, MutationObserverInit, MutationRecord, MutationRegistry};
pub use node::*;
pub use tree::{BulkRemoval, Dom};
