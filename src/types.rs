//! Core types for async-htm
//!
//! This module defines the element model and the configuration types:
//!
//! - [`Element`] / [`ElementType`] - the `{type, props, children}` record built by `h`
//! - [`Component`] / [`AsyncComponent`] - function-typed elements
//! - [`Statics`] / [`TemplateId`] - the static half of a template invocation
//! - [`TemplateConfig`] / [`CacheMode`] - compile-cache behaviour of an [`Htm`](crate::Htm)
//! - [`RenderConfig`] - renderer behaviour
//!
//! # Usage
//!
//! ```rust,ignore
//! use async_htm::{Htm, TemplateConfig, CacheMode};
//!
//! let config = TemplateConfig::default()
//!     .with_cache_mode(CacheMode::Normal)
//!     .with_static_folding(false);
//!
//! let htm = Htm::builder().with_config(config).build();
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::{serialize_props, Pending, Value};

/// Element props, in insertion order
pub type Props = IndexMap<String, Value>;

/// Conversion of a record into element props
///
/// Usually derived with `#[derive(IntoProps)]` (feature `derive`), which
/// also implements `From<T> for Value` so the record can be spread into a
/// template with `...${record}`.
pub trait IntoProps {
    fn into_props(self) -> Props;
}

impl IntoProps for Props {
    fn into_props(self) -> Props {
        self
    }
}

/// Signature of a synchronous component
pub type ComponentFn = dyn Fn(&Props, &[Value]) -> Result<Value> + Send + Sync;

/// A function-typed element
///
/// Components are called with the element's props and children when the
/// renderer reaches them. The returned value is rendered in their place; it
/// may be anything renderable, including a [`Value::Pending`].
///
/// Two components are equal only if they are the same function instance.
#[derive(Clone)]
pub struct Component {
    name: Cow<'static, str>,
    func: Arc<ComponentFn>,
}

impl Component {
    /// Create an anonymous component
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Props, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::named("anonymous", func)
    }

    /// Create a component with a name used in diagnostics
    pub fn named<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(&Props, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Create a component from an async closure
    ///
    /// The closure receives owned copies of the props and children.
    pub fn asynchronous<F, Fut>(func: F) -> Self
    where
        F: Fn(Props, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::new(move |props, children| {
            Ok(Value::Pending(Pending::new(func(
                props.clone(),
                children.to_vec(),
            ))))
        })
    }

    /// Create a component from an [`AsyncComponent`] implementation
    pub fn from_async<C: AsyncComponent>(component: C) -> Self {
        let component = Arc::new(component);
        Self::named(std::any::type_name::<C>(), move |props, children| {
            let component = Arc::clone(&component);
            let props = props.clone();
            let children = children.to_vec();
            Ok(Value::Pending(Pending::new(async move {
                component.render(props, children).await
            })))
        })
    }

    /// Invoke the component
    pub fn call(&self, props: &Props, children: &[Value]) -> Result<Value> {
        (self.func)(props, children)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

/// A component whose body is asynchronous
///
/// # Examples
///
/// ```rust,ignore
/// use async_htm::{async_trait, AsyncComponent, Component, Props, Result, Value};
///
/// struct Greeting;
///
/// #[async_trait]
/// impl AsyncComponent for Greeting {
///     async fn render(&self, props: Props, _children: Vec<Value>) -> Result<Value> {
///         let name = props.get("name").map(Value::to_js_string).unwrap_or_default();
///         Ok(Value::from(format!("Hello, {}!", name)))
///     }
/// }
///
/// let greeting = Component::from_async(Greeting);
/// ```
#[async_trait]
pub trait AsyncComponent: Send + Sync + 'static {
    async fn render(&self, props: Props, children: Vec<Value>) -> Result<Value>;
}

/// The `type` of an element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    /// No type was given
    Missing,
    /// `""`: children are rendered in place of the element
    Fragment,
    /// A tag name, as written
    Tag(String),
    Component(Component),
    /// A type value of an unusable kind, by its `typeof` name
    Invalid(&'static str),
}

impl ElementType {
    /// The JavaScript `typeof` name of the type value
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementType::Missing => "undefined",
            ElementType::Fragment | ElementType::Tag(_) => "string",
            ElementType::Component(_) => "function",
            ElementType::Invalid(name) => name,
        }
    }

    fn to_value(&self) -> Option<Value> {
        match self {
            ElementType::Fragment => Some(Value::Str(String::new())),
            ElementType::Tag(tag) => Some(Value::Str(tag.clone())),
            _ => None,
        }
    }
}

impl From<Value> for ElementType {
    fn from(value: Value) -> Self {
        match value {
            Value::Undefined => ElementType::Missing,
            Value::Str(tag) if tag.is_empty() => ElementType::Fragment,
            Value::Str(tag) => ElementType::Tag(tag),
            Value::Component(component) => ElementType::Component(component),
            other => ElementType::Invalid(other.type_name()),
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::from(Value::from(tag))
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        ElementType::from(Value::Str(tag))
    }
}

impl From<Component> for ElementType {
    fn from(component: Component) -> Self {
        ElementType::Component(component)
    }
}

/// A renderable element record
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub element_type: ElementType,
    pub props: Props,
    pub children: Vec<Value>,
    /// The component's result is trusted markup and is emitted unescaped
    pub skip_string_escape: bool,
}

impl Element {
    pub fn new(element_type: impl Into<ElementType>, props: Props, children: Vec<Value>) -> Self {
        Self {
            element_type: element_type.into(),
            props,
            children,
            skip_string_escape: false,
        }
    }

    /// The tag name, for tag elements
    pub fn tag(&self) -> Option<&str> {
        match &self.element_type {
            ElementType::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// Read an element-like map: `{ type, props, children, skipStringEscape }`
    ///
    /// A missing `type` yields [`ElementType::Missing`]; a non-list
    /// `children` value becomes the single child.
    pub fn from_object(map: &Props) -> Self {
        let element_type = map
            .get("type")
            .cloned()
            .map(ElementType::from)
            .unwrap_or(ElementType::Missing);

        let props = match map.get("props") {
            Some(Value::Object(props)) => props.clone(),
            _ => Props::new(),
        };

        let children = match map.get("children") {
            Some(Value::List(children)) => children.clone(),
            Some(Value::Undefined) | None => Vec::new(),
            Some(child) => vec![child.clone()],
        };

        Self {
            element_type,
            props,
            children,
            skip_string_escape: matches!(map.get("skipStringEscape"), Some(Value::Bool(true))),
        }
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct PropsRef<'a>(&'a Props);

        impl Serialize for PropsRef<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serialize_props(self.0, serializer)
            }
        }

        let mut map = serializer.serialize_map(None)?;
        if let Some(element_type) = self.element_type.to_value() {
            map.serialize_entry("type", &element_type)?;
        }
        map.serialize_entry("props", &PropsRef(&self.props))?;
        map.serialize_entry("children", &Value::List(self.children.clone()))?;
        if self.skip_string_escape {
            map.serialize_entry("skipStringEscape", &true)?;
        }
        map.end()
    }
}

/// Stable identity of a template call site
///
/// Compiled templates are cached per `TemplateId`, so one id must always
/// denote the same static parts. [`html!`](crate::html) derives it from the
/// source location of the invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateId(Cow<'static, str>);

impl TemplateId {
    pub const fn call_site(location: &'static str) -> Self {
        TemplateId(Cow::Borrowed(location))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for TemplateId {
    fn from(id: &'static str) -> Self {
        TemplateId(Cow::Borrowed(id))
    }
}

impl From<String> for TemplateId {
    fn from(id: String) -> Self {
        TemplateId(Cow::Owned(id))
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The static parts of one template invocation
///
/// There is always exactly one more part than there are interpolated
/// values.
#[derive(Debug, Clone)]
pub struct Statics<'a> {
    id: TemplateId,
    parts: &'a [&'a str],
}

impl<'a> Statics<'a> {
    pub fn new(id: impl Into<TemplateId>, parts: &'a [&'a str]) -> Self {
        Self {
            id: id.into(),
            parts,
        }
    }

    /// Statics identified by their own content
    ///
    /// Useful for templates assembled at runtime. Identical parts share one
    /// compiled template. Each part is length-prefixed, so no two part lists
    /// map to the same id.
    pub fn keyed_by_content(parts: &'a [&'a str]) -> Self {
        let mut id = String::with_capacity(parts.iter().map(|part| part.len() + 4).sum());
        for part in parts {
            id.push_str(&part.len().to_string());
            id.push(':');
            id.push_str(part);
        }
        Self::new(id, parts)
    }

    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    pub fn parts(&self) -> &'a [&'a str] {
        self.parts
    }
}

/// Compile-cache behaviour of an [`Htm`](crate::Htm)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheMode {
    /// Compile on every call
    None,
    /// Compile once per call site and reuse
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub(crate) cache_mode: CacheMode,
    pub(crate) fold_static_subtrees: bool,
}

impl TemplateConfig {
    /// Create a new template configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache mode
    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Enable or disable reuse of fully static subtrees across evaluations
    pub fn with_static_folding(mut self, enabled: bool) -> Self {
        self.fold_static_subtrees = enabled;
        self
    }

    /// Cache compiled templates and fold static subtrees
    pub fn aggressive_caching() -> Self {
        Self {
            cache_mode: CacheMode::Normal,
            fold_static_subtrees: true,
        }
    }

    /// Compile on every call; nothing is retained
    pub fn no_caching() -> Self {
        Self {
            cache_mode: CacheMode::None,
            fold_static_subtrees: false,
        }
    }

    // Accessors
    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }
    pub fn fold_static_subtrees(&self) -> bool {
        self.fold_static_subtrees
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self::aggressive_caching()
    }
}

/// Renderer behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub(crate) max_concurrency: usize,
    pub(crate) buffer_size: usize,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many list members may be rendered ahead of the one being emitted
    ///
    /// Output order never changes. With `1` (the default) rendering is fully
    /// lazy: a member is not touched until the previous one is drained.
    pub fn with_max_concurrency(mut self, members: usize) -> Self {
        self.max_concurrency = members.max(1);
        self
    }

    /// Number of fragments per chunk for [`RenderStream::next_chunk`](crate::RenderStream::next_chunk)
    pub fn with_buffer_size(mut self, fragments: usize) -> Self {
        self.buffer_size = fragments.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            buffer_size: 64,
        }
    }
}
