//! DOM node model.
//!
//! All nodes live in an `Arena<Node>` and are referenced by `NodeId` (a generational index).
//! The tree structure is encoded via parent/child/sibling links stored directly on each node.

/// A handle into the arena that uniquely identifies a DOM node.
pub type NodeId = arena::GenIndex;

/// XML namespace for an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowRootMode {
    Open,
    Closed,
}

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

/// A single attribute on an element (e.g. `class="foo"`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            value: value.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Element data
// ---------------------------------------------------------------------------

/// Data specific to element nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    pub namespace: Namespace,
    /// Lowercased local name.
    pub tag_name: String,
    pub attrs: Vec<Attr>,
    /// Cached `id` attribute value for fast lookup.
    pub id: Option<String>,
    /// Cached list of class names (split from the `class` attribute).
    pub classes: Vec<String>,
    /// Checkedness of checkbox and radio inputs and selectedness of options.
    /// Starts from the `checked`/`selected` attribute; afterwards only
    /// [`crate::Dom::set_checked`] changes it, and it produces no mutation record.
    pub checked: bool,
    /// Current value of a form control. Same rules as `checked`.
    pub value: String,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// `type` attribute of an `<input>`, lowercased, defaulting to `text`.
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    /// Refresh the `id` / `classes` caches after `attrs` changed.
    pub(crate) fn sync_caches(&mut self) {
        self.id = self.attr("id").map(str::to_string);
        self.classes = self
            .attr("class")
            .map(|v| v.split_whitespace().map(String::from).collect())
            .unwrap_or_default();
    }
}

// ---------------------------------------------------------------------------
// Node data (variant per node type)
// ---------------------------------------------------------------------------

/// The payload that distinguishes different kinds of DOM nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text { data: String },
    Comment { data: String },
    /// Root of a shadow tree. It has no parent; `host` points back at the
    /// element it is attached to.
    ShadowRoot { mode: ShadowRootMode, host: NodeId },
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single node in the DOM tree.
///
/// Tree links (`parent`, `first_child`, …) form an intrusive doubly-linked
/// child list so that insertions and removals are O(1).
#[derive(Clone, Debug)]
pub struct Node {
    pub data: NodeData,

    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,

    /// Shadow root attached to this element, if any.
    pub shadow_root: Option<NodeId>,
}

impl Node {
    /// Create a new detached node.
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            shadow_root: None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text { .. })
    }

    /// Documents and shadow roots: nodes that can root a tree.
    pub fn is_tree_root_kind(&self) -> bool {
        matches!(self.data, NodeData::Document | NodeData::ShadowRoot { .. })
    }

    /// If this is an element, return a reference to its [`ElementData`].
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// If this is an element, return a mutable reference to its [`ElementData`].
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }
}
