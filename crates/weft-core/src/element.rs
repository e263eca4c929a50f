//! Descriptor construction: the declarative tree the reconciler consumes.
//!
//! A [`Descriptor`] is an immutable record of what one UI position should
//! look like. The reconciler reads its type tag, key, ref slot and props and
//! nothing else; everything host-specific stays behind the adapter boundary.

use std::fmt;

use smallvec::SmallVec;

/// A function component: pure from props to a child descriptor. State is
/// carried through the hook store, never through captures, so a plain fn
/// pointer suffices and gives stable identity across renders.
pub type ComponentFn = fn(&Props) -> Descriptor;

/// Discriminant of an element descriptor.
#[derive(Clone, Debug)]
pub enum TypeTag {
    /// Intrinsic host element, selected by tag name (`"div"`, `"h1"`, ...).
    Host(String),
    /// Function component.
    Component(ComponentFn),
    /// Reserved marker for the mounted root. Only valid at the top of a
    /// mounted tree; in child position it is a malformed descriptor.
    Root,
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Host(a), Self::Host(b)) => a == b,
            (Self::Component(a), Self::Component(b)) => *a as usize == *b as usize,
            (Self::Root, Self::Root) => true,
            _ => false,
        }
    }
}

/// One prop value. A closed set: the reconciler only ever compares values
/// structurally and hands child descriptors back to the begin phase.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Nodes(Vec<Descriptor>),
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Descriptor>> for PropValue {
    fn from(value: Vec<Descriptor>) -> Self {
        Self::Nodes(value)
    }
}

/// Key under which child descriptors ride inside props.
pub(crate) const CHILDREN_PROP: &str = "children";

/// Key under which a text fiber carries its content.
pub(crate) const CONTENT_PROP: &str = "content";

/// Immutable, ordered key→value mapping supplied to a render pass.
///
/// Order is insertion order; equality is structural and order-sensitive,
/// which is what the complete-phase diff relies on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    entries: SmallVec<[(String, PropValue); 4]>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Replaces an existing entry in place so the
    /// original ordering is preserved.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Child descriptors carried by these props, normalized: scalar children
    /// become text descriptors, boolean children render as nothing.
    pub fn children(&self) -> Vec<Descriptor> {
        match self.get(CHILDREN_PROP) {
            Some(PropValue::Nodes(nodes)) => nodes.clone(),
            Some(PropValue::Str(text)) => vec![Descriptor::Text(text.clone())],
            Some(PropValue::Int(value)) => vec![Descriptor::Text(value.to_string())],
            Some(PropValue::Float(value)) => vec![Descriptor::Text(value.to_string())],
            Some(PropValue::Bool(_)) | None => Vec::new(),
        }
    }

    /// Props of a text fiber: just the content slot.
    pub(crate) fn text(content: impl Into<String>) -> Self {
        Self::new().with(CONTENT_PROP, content.into())
    }

    pub(crate) fn text_content(&self) -> Option<&str> {
        match self.get(CONTENT_PROP) {
            Some(PropValue::Str(content)) => Some(content),
            _ => None,
        }
    }
}

/// An element descriptor: `{ type_tag, key, ref, props }`.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub type_tag: TypeTag,
    pub key: Option<String>,
    /// Carried for source fidelity, never read by the reconciler.
    pub ref_name: Option<String>,
    pub props: Props,
}

/// One node of the declarative tree: an element or a bare text run.
#[derive(Clone, PartialEq)]
pub enum Descriptor {
    Element(Element),
    Text(String),
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => element.fmt(f),
            Self::Text(text) => write!(f, "Text({text:?})"),
        }
    }
}

/// Common constructor, the `jsx()` of this crate: folds children into the
/// props under the `children` key.
pub fn jsx(
    type_tag: TypeTag,
    props: Props,
    children: impl IntoIterator<Item = Descriptor>,
) -> Descriptor {
    jsx_keyed(type_tag, None, None, props, children)
}

/// [`jsx`] with explicit key and ref slots.
pub fn jsx_keyed(
    type_tag: TypeTag,
    key: Option<&str>,
    ref_name: Option<&str>,
    mut props: Props,
    children: impl IntoIterator<Item = Descriptor>,
) -> Descriptor {
    let children: Vec<Descriptor> = children.into_iter().collect();
    if !children.is_empty() {
        props.set(CHILDREN_PROP, children);
    }
    Descriptor::Element(Element {
        type_tag,
        key: key.map(str::to_owned),
        ref_name: ref_name.map(str::to_owned),
        props,
    })
}

/// Intrinsic host element, e.g. `host("div", Props::new(), [text("hi")])`.
pub fn host(
    tag: &str,
    props: Props,
    children: impl IntoIterator<Item = Descriptor>,
) -> Descriptor {
    jsx(TypeTag::Host(tag.to_owned()), props, children)
}

/// Function component element.
pub fn component(f: ComponentFn, props: Props) -> Descriptor {
    jsx(TypeTag::Component(f), props, std::iter::empty())
}

/// Bare text run.
pub fn text(content: impl Into<String>) -> Descriptor {
    Descriptor::Text(content.into())
}
