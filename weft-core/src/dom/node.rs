//! Node Description Model
//!
//! Immutable, declarative descriptions of document structure. A description
//! is data: the reconciler turns it into live nodes on mount and diffs the
//! previous description against the next one on every re-render.
//!
//! The model is a closed sum type, so every shape a description can take is
//! matched exhaustively — there is no "unknown child" case at runtime.
//! Dynamic leaves are zero-argument closures re-evaluated reactively; text
//! is pre-stringified at construction (`true` renders as text, `false` and
//! `Option::None` render nothing, numbers render via `to_string`).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::host::EventHandler;

/// A dynamic child: re-evaluated inside its own effect whenever a signal it
/// reads changes.
pub type DynamicFn = Arc<dyn Fn() -> VNode + Send + Sync>;

/// A reactive attribute value producer.
pub type AccessorFn = Arc<dyn Fn() -> AttrValue + Send + Sync>;

/// A resolved attribute value.
///
/// `Bool(true)` writes an empty-valued attribute, `Bool(false)` removes the
/// attribute, text is written verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Text(value.to_string())
    }
}

/// A property in an element description.
#[derive(Clone)]
pub enum PropValue {
    /// Plain value, written once and patched by equality.
    Static(AttrValue),
    /// Function-valued prop: wrapped in its own effect and re-applied
    /// whenever a dependency changes.
    Accessor(AccessorFn),
    /// Event handler; attached under the prop name minus its `on` prefix,
    /// lowercased. Replaced only when the callable identity changes.
    Handler(EventHandler),
}

impl PropValue {
    /// Build a reactive attribute prop.
    pub fn accessor<F, V>(f: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<AttrValue>,
    {
        Self::Accessor(Arc::new(move || f().into()))
    }

    /// Build an event-handler prop.
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&super::host::Event) + Send + Sync + 'static,
    {
        Self::Handler(Arc::new(f))
    }
}

impl From<AttrValue> for PropValue {
    fn from(value: AttrValue) -> Self {
        Self::Static(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Static(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Static(value.into())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Static(value.into())
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Static(value.into())
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Accessor(_) => f.write_str("Accessor(..)"),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// An element description: tag, props in author order, children.
#[derive(Clone, Debug)]
pub struct VElement {
    pub tag: String,
    pub props: IndexMap<String, PropValue>,
    pub children: Vec<VNode>,
}

impl VElement {
    /// Start a description for the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Add a prop.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Add a reactive attribute prop.
    pub fn prop_fn<F, V>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<AttrValue>,
    {
        self.props.insert(name.into(), PropValue::accessor(f));
        self
    }

    /// Attach an event handler (`on("click", ..)` stores the `onclick`
    /// prop).
    pub fn on<F>(mut self, event: &str, f: F) -> Self
    where
        F: Fn(&super::host::Event) + Send + Sync + 'static,
    {
        self.props
            .insert(format!("on{event}"), PropValue::handler(f));
        self
    }

    /// Set the reconciliation key.
    pub fn key(self, key: impl Into<String>) -> Self {
        let key: String = key.into();
        self.prop("key", key)
    }

    /// Append one child.
    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append a sequence of children.
    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<VNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// The resolved reconciliation key: the static `key` prop, if present.
    pub(crate) fn resolved_key(&self) -> Option<String> {
        match self.props.get("key") {
            Some(PropValue::Static(AttrValue::Text(key))) => Some(key.clone()),
            _ => None,
        }
    }
}

/// Shorthand for [`VElement::new`].
pub fn el(tag: impl Into<String>) -> VElement {
    VElement::new(tag)
}

/// Build a dynamic child from a closure.
pub fn dynamic<F, N>(f: F) -> VNode
where
    F: Fn() -> N + Send + Sync + 'static,
    N: Into<VNode>,
{
    VNode::Dynamic(Arc::new(move || f().into()))
}

/// A node description.
#[derive(Clone)]
pub enum VNode {
    /// An element with props and children.
    Element(VElement),
    /// Text content (strings, numbers, `true`).
    Text(String),
    /// A reactively re-evaluated child.
    Dynamic(DynamicFn),
    /// A sequence of siblings, flattened recursively.
    Fragment(Vec<VNode>),
    /// Renders nothing (`false`, `Option::None`).
    Empty,
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

impl From<VElement> for VNode {
    fn from(element: VElement) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for VNode {
    fn from(value: bool) -> Self {
        if value {
            Self::Text("true".to_string())
        } else {
            Self::Empty
        }
    }
}

impl From<i64> for VNode {
    fn from(value: i64) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i32> for VNode {
    fn from(value: i32) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<usize> for VNode {
    fn from(value: usize) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for VNode {
    fn from(value: f64) -> Self {
        Self::Text(value.to_string())
    }
}

impl<N> From<Option<N>> for VNode
where
    N: Into<VNode>,
{
    fn from(value: Option<N>) -> Self {
        match value {
            Some(node) => node.into(),
            None => Self::Empty,
        }
    }
}

impl<N> From<Vec<N>> for VNode
where
    N: Into<VNode>,
{
    fn from(children: Vec<N>) -> Self {
        Self::Fragment(children.into_iter().map(Into::into).collect())
    }
}

/// Flatten one description into the sibling list it denotes: fragments are
/// expanded recursively, empties contribute nothing.
pub(crate) fn normalize_node(node: VNode) -> Vec<VNode> {
    let mut flat = Vec::new();
    push_normalized(node, &mut flat);
    flat
}

/// Flatten a child list (see [`normalize_node`]).
pub(crate) fn normalize_children(children: Vec<VNode>) -> Vec<VNode> {
    let mut flat = Vec::new();
    for child in children {
        push_normalized(child, &mut flat);
    }
    flat
}

fn push_normalized(node: VNode, flat: &mut Vec<VNode>) {
    match node {
        VNode::Fragment(children) => {
            for child in children {
                push_normalized(child, flat);
            }
        }
        VNode::Empty => {}
        other => flat.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_like_conversions() {
        assert!(matches!(VNode::from("hi"), VNode::Text(ref t) if t == "hi"));
        assert!(matches!(VNode::from(42i64), VNode::Text(ref t) if t == "42"));
        assert!(matches!(VNode::from(true), VNode::Text(ref t) if t == "true"));
        assert!(matches!(VNode::from(false), VNode::Empty));
        assert!(matches!(VNode::from(None::<VElement>), VNode::Empty));
    }

    #[test]
    fn normalization_flattens_recursively() {
        let tree = VNode::Fragment(vec![
            VNode::from("a"),
            VNode::Empty,
            VNode::Fragment(vec![
                VNode::from("b"),
                VNode::Fragment(vec![VNode::from("c"), VNode::Empty]),
            ]),
        ]);

        let flat = normalize_node(tree);
        let texts: Vec<&str> = flat
            .iter()
            .map(|node| match node {
                VNode::Text(text) => text.as_str(),
                _ => panic!("expected text"),
            })
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn builder_resolves_key() {
        let element = el("li").key("row-1").child("first");
        assert_eq!(element.resolved_key(), Some("row-1".to_string()));
        assert!(el("li").resolved_key().is_none());
    }

    #[test]
    fn props_keep_author_order() {
        let element = el("input")
            .prop("type", "text")
            .prop("value", "x")
            .prop("disabled", true);
        let names: Vec<&str> = element.props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["type", "value", "disabled"]);
    }
}
