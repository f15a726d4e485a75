//! The renderable value model
//!
//! [`Value`] is the closed set of things a template can be interpolated
//! with, a factory can return, and the renderer can consume. The renderer
//! decides what to do with an item by matching on its variant once; there
//! is no repeated type sniffing.
//!
//! # Variants
//!
//! | Variant | Renders as |
//! |---------|------------|
//! | `Undefined`, `Null` | an empty fragment |
//! | `Str` | escaped text |
//! | `Number` | its decimal form |
//! | `List`, `Items` | each member in order |
//! | `Pending` | whatever it resolves to |
//! | `Element` | markup |
//! | `Object` | markup, if the map describes an element |
//! | `Bool`, `Component` | an error when rendered bare |
//!
//! # Conversions
//!
//! Most Rust values convert with `From`/`Into`:
//!
//! ```rust,ignore
//! use async_htm::Value;
//!
//! let text: Value = "hello".into();
//! let count: Value = 3.into();
//! let maybe: Value = None::<String>.into(); // Value::Undefined
//! let list: Value = vec!["a", "b"].into();
//! let json: Value = serde_json::json!({ "id": 1 }).into();
//! ```
//!
//! Asynchronous values are wrapped with [`Value::pending`] (or
//! [`Value::try_pending`] for fallible futures), lazy sequences with
//! [`Value::iter`] and [`Value::stream`].

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::types::{Component, Element, Props};
use crate::utils::format_number;

/// A renderable (and interpolatable) value
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,
    /// Explicitly empty value
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// Ordered sequence, rendered member by member
    List(Vec<Value>),
    /// One-shot lazy sequence (iterator or async stream)
    Items(Items),
    /// A value that resolves later
    Pending(Pending),
    /// An element record; shared so static subtrees can be reused by reference
    Element(Arc<Element>),
    /// A component function
    Component(Component),
    /// A string-keyed map (spread props, structured prop values, element-like maps)
    Object(Props),
}

impl Value {
    /// Wrap an infallible future
    pub fn pending<F, T>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        T: Into<Value>,
    {
        Value::Pending(Pending::new(async move { Ok(future.await.into()) }))
    }

    /// Wrap a fallible future; its error aborts the render that awaits it
    pub fn try_pending<F, T>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Into<Value>,
    {
        Value::Pending(Pending::new(async move { future.await.map(Into::into) }))
    }

    /// Wrap a lazy iterator; it is consumed by the first render that reaches it
    pub fn iter<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value> + 'static,
        I::IntoIter: Send + 'static,
    {
        Value::Items(Items::from_iterator(items.into_iter().map(Into::into)))
    }

    /// Wrap an async stream; it is consumed by the first render that reaches it
    pub fn stream<S>(items: S) -> Self
    where
        S: Stream + Send + 'static,
        S::Item: Into<Value>,
    {
        Value::Items(Items::from_stream(items.map(Into::into).boxed()))
    }

    /// The JavaScript `typeof` name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Component(_) => "function",
            Value::Null
            | Value::List(_)
            | Value::Items(_)
            | Value::Pending(_)
            | Value::Element(_)
            | Value::Object(_) => "object",
        }
    }

    /// JavaScript falsiness: `undefined`, `null`, `false`, `0`, `NaN` and `""`
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => *n == 0.0 || n.is_nan(),
            Value::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    /// `undefined` or `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// String coercion with JavaScript `String(value)` semantics
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Pending(_) => "[object Promise]".to_string(),
            Value::Component(component) => format!("function {}() {{}}", component.name()),
            Value::Items(_) | Value::Element(_) | Value::Object(_) => "[object Object]".to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Arc<Element>> {
        match self {
            Value::Element(element) => Some(element),
            _ => None,
        }
    }

    /// JSON form, as `JSON.stringify` would produce it
    ///
    /// Functions and `undefined` members of maps are omitted; pending
    /// values and lazy sequences serialize as empty objects.
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    fn is_json_omitted(&self) -> bool {
        matches!(self, Value::Undefined | Value::Component(_))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null | Value::Component(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if !n.is_finite() => serializer.serialize_unit(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    if item.is_json_omitted() {
                        seq.serialize_element(&Value::Null)?;
                    } else {
                        seq.serialize_element(item)?;
                    }
                }
                seq.end()
            }
            Value::Object(props) => serialize_props(props, serializer),
            Value::Element(element) => element.serialize(serializer),
            Value::Items(_) | Value::Pending(_) => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

pub(crate) fn serialize_props<S: Serializer>(
    props: &Props,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    for (key, value) in props.iter().filter(|(_, v)| !v.is_json_omitted()) {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Component(a), Value::Component(b)) => a == b,
            (Value::Pending(a), Value::Pending(b)) => a.ptr_eq(b),
            (Value::Items(a), Value::Items(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// A shared, re-awaitable future of a [`Value`]
///
/// Every clone observes the same single computation, so a pending value
/// folded into a static subtree can be rendered any number of times.
#[derive(Clone)]
pub struct Pending {
    inner: Shared<BoxFuture<'static, Result<Value>>>,
}

impl Pending {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// An already-resolved pending value
    pub fn ready(value: Value) -> Self {
        Self::new(futures::future::ready(Ok(value)))
    }

    /// Await the value
    pub async fn resolve(&self) -> Result<Value> {
        self.inner.clone().await
    }

    /// The outcome, if the future already completed
    pub fn peek(&self) -> Option<&Result<Value>> {
        self.inner.peek()
    }

    pub fn ptr_eq(&self, other: &Pending) -> bool {
        self.inner.ptr_eq(&other.inner)
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(outcome) => f.debug_tuple("Pending").field(outcome).finish(),
            None => f.write_str("Pending(<unresolved>)"),
        }
    }
}

enum ItemSource {
    Iter(Box<dyn Iterator<Item = Value> + Send>),
    Stream(BoxStream<'static, Value>),
}

/// A one-shot lazy sequence of values
///
/// Like a generator, it can be drained once: the first render that reaches
/// it takes the source, later renders see an empty sequence.
#[derive(Clone)]
pub struct Items {
    source: Arc<Mutex<Option<ItemSource>>>,
}

impl Items {
    pub fn from_iterator<I>(iter: I) -> Self
    where
        I: Iterator<Item = Value> + Send + 'static,
    {
        Self::with_source(ItemSource::Iter(Box::new(iter)))
    }

    pub fn from_stream(items: BoxStream<'static, Value>) -> Self {
        Self::with_source(ItemSource::Stream(items))
    }

    fn with_source(source: ItemSource) -> Self {
        Self {
            source: Arc::new(Mutex::new(Some(source))),
        }
    }

    /// Take the sequence as a stream, leaving it consumed
    pub fn take_stream(&self) -> BoxStream<'static, Value> {
        let source = match self.source.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match source {
            Some(ItemSource::Iter(iter)) => stream::iter(iter).boxed(),
            Some(ItemSource::Stream(items)) => items,
            None => stream::empty().boxed(),
        }
    }

    pub fn is_consumed(&self) -> bool {
        match self.source.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    pub fn ptr_eq(&self, other: &Items) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl fmt::Debug for Items {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consumed() {
            f.write_str("Items(<consumed>)")
        } else {
            f.write_str("Items(<lazy>)")
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Undefined)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Props> for Value {
    fn from(props: Props) -> Self {
        Value::Object(props)
    }
}

impl From<Element> for Value {
    fn from(element: Element) -> Self {
        Value::Element(Arc::new(element))
    }
}

impl From<Arc<Element>> for Value {
    fn from(element: Arc<Element>) -> Self {
        Value::Element(element)
    }
}

impl From<Component> for Value {
    fn from(component: Component) -> Self {
        Value::Component(component)
    }
}

impl From<Pending> for Value {
    fn from(pending: Pending) -> Self {
        Value::Pending(pending)
    }
}

impl From<Items> for Value {
    fn from(items: Items) -> Self {
        Value::Items(items)
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            JsonValue::String(s) => Value::Str(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}
