//! User-facing callback sets.

use std::fmt;
use std::rc::Rc;

use dom::{Dom, NodeId};

/// Callback run with the element that started or stopped matching.
pub type ElementFn = Rc<dyn Fn(NodeId) -> anyhow::Result<()>>;

/// Runs once per (element, observer) pair. May hand back an [`Initializer`]
/// holding element-specific `add`/`remove` hooks.
pub type InitializeFn = Rc<dyn Fn(NodeId) -> anyhow::Result<Option<Initializer>>>;

/// Runs on every add; the returned [`Subscription`] is torn down on the
/// matching remove.
pub type SubscribeFn = Rc<dyn Fn(NodeId) -> anyhow::Result<Subscription>>;

/// Per-element hooks returned from `initialize`. Its `add` runs before the
/// observer's own `add`, its `remove` before the observer's own `remove`.
#[derive(Clone, Default)]
pub struct Initializer {
    pub add: Option<ElementFn>,
    pub remove: Option<ElementFn>,
}

impl Initializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The older initializer shape that only knows how to undo itself.
    pub fn remove_only(remove: impl Fn(NodeId) -> anyhow::Result<()> + 'static) -> Self {
        Self::new().on_remove(remove)
    }

    pub fn on_add(mut self, add: impl Fn(NodeId) -> anyhow::Result<()> + 'static) -> Self {
        self.add = Some(Rc::new(add));
        self
    }

    pub fn on_remove(mut self, remove: impl Fn(NodeId) -> anyhow::Result<()> + 'static) -> Self {
        self.remove = Some(Rc::new(remove));
        self
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Initializer")
            .field("add", &self.add.is_some())
            .field("remove", &self.remove.is_some())
            .finish()
    }
}

/// Teardown handle produced by a `subscribe` handler.
#[derive(Default)]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn unsubscribe(mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.teardown.is_some())
            .finish()
    }
}

/// Which elements an observer is willing to handle, on top of its selector.
/// Rejected elements never see `initialize`, `add` or `remove`.
#[derive(Clone, Default)]
pub enum ElementFilter {
    #[default]
    Any,
    /// Only elements with this tag name (ASCII case-insensitive).
    Tag(String),
    /// Must not mutate the document.
    Predicate(Rc<dyn Fn(&Dom, NodeId) -> bool>),
}

impl ElementFilter {
    pub fn predicate(f: impl Fn(&Dom, NodeId) -> bool + 'static) -> Self {
        ElementFilter::Predicate(Rc::new(f))
    }

    pub fn accepts(&self, dom: &Dom, el: NodeId) -> bool {
        match self {
            ElementFilter::Any => dom.is_element(el),
            ElementFilter::Tag(tag) => dom.tag_name(el).is_some_and(|t| t.eq_ignore_ascii_case(tag)),
            ElementFilter::Predicate(f) => dom.is_element(el) && f(dom, el),
        }
    }
}

impl fmt::Debug for ElementFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementFilter::Any => f.write_str("Any"),
            ElementFilter::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            ElementFilter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// The callbacks of one observer. At least one of them must be set.
#[derive(Clone, Default)]
pub struct Handlers {
    pub initialize: Option<InitializeFn>,
    pub add: Option<ElementFn>,
    pub remove: Option<ElementFn>,
    pub subscribe: Option<SubscribeFn>,
    pub filter: ElementFilter,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers consisting of a lone `initialize` function.
    pub fn from_initialize(
        initialize: impl Fn(NodeId) -> anyhow::Result<Option<Initializer>> + 'static,
    ) -> Self {
        Self::new().initialize(initialize)
    }

    pub fn initialize(
        mut self,
        initialize: impl Fn(NodeId) -> anyhow::Result<Option<Initializer>> + 'static,
    ) -> Self {
        self.initialize = Some(Rc::new(initialize));
        self
    }

    pub fn on_add(mut self, add: impl Fn(NodeId) -> anyhow::Result<()> + 'static) -> Self {
        self.add = Some(Rc::new(add));
        self
    }

    pub fn on_remove(mut self, remove: impl Fn(NodeId) -> anyhow::Result<()> + 'static) -> Self {
        self.remove = Some(Rc::new(remove));
        self
    }

    pub fn subscribe(mut self, subscribe: impl Fn(NodeId) -> anyhow::Result<Subscription> + 'static) -> Self {
        self.subscribe = Some(Rc::new(subscribe));
        self
    }

    pub fn filter(mut self, filter: ElementFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.initialize.is_none() && self.add.is_none() && self.remove.is_none() && self.subscribe.is_none()
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("initialize", &self.initialize.is_some())
            .field("add", &self.add.is_some())
            .field("remove", &self.remove.is_some())
            .field("subscribe", &self.subscribe.is_some())
            .field("filter", &self.filter)
            .finish()
    }
}

/// The accepted registration shapes, normalised by [`ObserveArgs::into_parts`].
#[derive(Clone)]
pub enum ObserveArgs {
    /// A selector and a lone initialize function.
    Initialize { selector: String, initialize: InitializeFn },
    /// A selector and a full handler set.
    Handlers { selector: String, handlers: Handlers },
}

impl ObserveArgs {
    pub fn initialize(
        selector: impl Into<String>,
        initialize: impl Fn(NodeId) -> anyhow::Result<Option<Initializer>> + 'static,
    ) -> Self {
        ObserveArgs::Initialize {
            selector: selector.into(),
            initialize: Rc::new(initialize),
        }
    }

    pub fn handlers(selector: impl Into<String>, handlers: Handlers) -> Self {
        ObserveArgs::Handlers {
            selector: selector.into(),
            handlers,
        }
    }

    pub fn selector(&self) -> &str {
        match self {
            ObserveArgs::Initialize { selector, .. } | ObserveArgs::Handlers { selector, .. } => selector,
        }
    }

    pub fn into_parts(self) -> (String, Handlers) {
        match self {
            ObserveArgs::Initialize { selector, initialize } => (
                selector,
                Handlers {
                    initialize: Some(initialize),
                    ..Handlers::default()
                },
            ),
            ObserveArgs::Handlers { selector, handlers } => (selector, handlers),
        }
    }
}

impl fmt::Debug for ObserveArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserveArgs::Initialize { selector, .. } => {
                f.debug_struct("Initialize").field("selector", selector).finish_non_exhaustive()
            }
            ObserveArgs::Handlers { selector, handlers } => f
                .debug_struct("Handlers")
                .field("selector", selector)
                .field("handlers", handlers)
                .finish(),
        }
    }
}

impl<S: Into<String>> From<(S, Handlers)> for ObserveArgs {
    fn from((selector, handlers): (S, Handlers)) -> Self {
        ObserveArgs::handlers(selector, handlers)
    }
}
