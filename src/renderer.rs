//! Streaming HTML renderer
//!
//! Turns a [`Value`] tree into a lazy, ordered stream of escaped string
//! fragments. Nothing is evaluated ahead of the consumer: components are
//! called, pending values awaited and lazy sequences pulled only when the
//! stream reaches them. Each list member is fully drained before the next
//! one starts, so output always follows source order.
//!
//! With [`RenderConfig::with_max_concurrency`] above 1, up to that many list
//! members are rendered ahead into buffers, which are still emitted in
//! source order.

use std::borrow::Cow;
use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::error::{Error, Result};
use crate::predicates::{is_attribute_name_valid, is_tag_valid, is_void_tag};
use crate::types::{Component, Element, ElementType, RenderConfig};
use crate::utils::{escape_html_cow, format_number};
use crate::value::Value;

/// A lazy stream of rendered fragments
pub type Fragments = BoxStream<'static, Result<String>>;

fn emit(fragment: impl Into<String>) -> Fragments {
    stream::once(future::ready(Ok(fragment.into()))).boxed()
}

fn fail(err: Error) -> Fragments {
    stream::once(future::ready(Err(err))).boxed()
}

/// End the stream right after its first error
fn until_error(fragments: Fragments) -> Fragments {
    fragments
        .scan(false, |failed, fragment| {
            if *failed {
                return future::ready(None);
            }
            *failed = fragment.is_err();
            future::ready(Some(fragment))
        })
        .boxed()
}

/// Build the stream on first poll instead of now
fn deferred<F>(make: F) -> Fragments
where
    F: FnOnce() -> Fragments + Send + 'static,
{
    stream::once(future::lazy(move |_| make())).flatten().boxed()
}

/// The main renderer that turns value trees into fragments
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the argument of a top-level render call
    ///
    /// A pending root is awaited first. Roots must be truthy; lists render
    /// each member as a root, strings and objects go to [`render_item`].
    ///
    /// The stream ends after the first error.
    ///
    /// [`render_item`]: Renderer::render_item
    pub fn render_root(self, item: Value) -> Fragments {
        until_error(self.root(item))
    }

    /// Render any renderable item
    ///
    /// The stream ends after the first error; nothing past it is rendered.
    pub fn render_item(self, item: Value) -> Fragments {
        until_error(self.item(item))
    }

    fn root(self, item: Value) -> Fragments {
        match item {
            Value::Pending(pending) => stream::once(async move { pending.resolve().await })
                .map_ok(move |resolved| self.render_resolved_root(resolved))
                .try_flatten()
                .boxed(),
            other => self.render_resolved_root(other),
        }
    }

    fn render_resolved_root(self, item: Value) -> Fragments {
        match item {
            Value::Undefined => fail(Error::root_static("Expected an argument")),
            item if item.is_falsy() => fail(Error::root_owned(format!(
                "Expected a non-falsy argument, got: {}",
                item.to_js_string()
            ))),
            Value::List(members) => stream::iter(members)
                .map(move |member| self.root(member))
                .flatten()
                .boxed(),
            item @ (Value::Str(_)
            | Value::Object(_)
            | Value::Element(_)
            | Value::Items(_)
            | Value::Pending(_)) => self.item(item),
            other => fail(Error::root_owned(format!(
                "Expected a string or an object, got: {}",
                other.type_name()
            ))),
        }
    }

    fn item(self, item: Value) -> Fragments {
        match item {
            Value::Undefined | Value::Null => emit(String::new()),
            Value::Str(text) => emit(escape_html_cow(&text).into_owned()),
            Value::Number(n) => emit(format_number(n)),
            Value::List(members) => self.render_members(stream::iter(members).boxed()),
            Value::Items(items) => deferred(move || self.render_members(items.take_stream())),
            Value::Pending(pending) => stream::once(async move { pending.resolve().await })
                .map_ok(move |resolved| self.item(resolved))
                .try_flatten()
                .boxed(),
            Value::Element(element) => self.render_element(element),
            Value::Object(map) => {
                if map.contains_key("type") {
                    self.render_element(Arc::new(Element::from_object(&map)))
                } else {
                    fail(Error::malformed(Value::Object(map).to_json().to_string()))
                }
            }
            other @ (Value::Bool(_) | Value::Component(_)) => {
                fail(Error::InvalidItemType(Cow::Borrowed(other.type_name())))
            }
        }
    }

    fn render_members(self, members: BoxStream<'static, Value>) -> Fragments {
        let ahead = self.config.max_concurrency();
        if ahead <= 1 {
            return members
                .map(move |member| self.item(member))
                .flatten()
                .boxed();
        }

        members
            .map(move |member| self.item(member).try_collect::<Vec<String>>())
            .buffered(ahead)
            .map_ok(|fragments| stream::iter(fragments.into_iter().map(Ok::<String, Error>)))
            .try_flatten()
            .boxed()
    }

    fn render_element(self, element: Arc<Element>) -> Fragments {
        match element.element_type.clone() {
            ElementType::Missing => {
                let preview = Value::Element(element).to_json().to_string();
                fail(Error::malformed(preview))
            }
            ElementType::Fragment => self.render_children(element),
            ElementType::Component(component) => self.render_component(component, element),
            ElementType::Tag(tag) => self.render_tag(tag, element),
            ElementType::Invalid(type_name) => {
                fail(Error::InvalidElementType(Cow::Borrowed(type_name)))
            }
        }
    }

    fn render_children(self, element: Arc<Element>) -> Fragments {
        let children = stream::iter(0..element.children.len())
            .map(move |index| element.children[index].clone())
            .boxed();
        self.render_members(children)
    }

    fn render_component(self, component: Component, element: Arc<Element>) -> Fragments {
        deferred(move || {
            let result = match component.call(&element.props, &element.children) {
                Ok(result) => result,
                Err(err) => return fail(err),
            };

            if !element.skip_string_escape {
                return self.item(result);
            }

            stream::once(async move {
                let resolved = match result {
                    Value::Pending(pending) => pending.resolve().await,
                    other => Ok(other),
                };
                match resolved {
                    Ok(Value::Str(markup)) => Ok(markup),
                    Ok(other) => Err(Error::InvalidRawResult(Cow::Borrowed(other.type_name()))),
                    Err(err) => Err(err),
                }
            })
            .boxed()
        })
    }

    fn render_tag(self, tag: String, element: Arc<Element>) -> Fragments {
        let name = tag.to_lowercase();

        // Void tags are matched as written, before lowercasing.
        if is_void_tag(&tag) {
            return emit(format!("<{}", name))
                .chain(render_props(element))
                .chain(emit(" />"))
                .boxed();
        }

        if !is_tag_valid(&name) {
            return fail(Error::tag_name(&name));
        }

        emit(format!("<{}", name))
            .chain(render_props(Arc::clone(&element)))
            .chain(emit(">"))
            .chain(self.render_children(element))
            .chain(emit(format!("</{}>", name)))
            .boxed()
    }
}

/// One fragment per emitted attribute, in insertion order
fn render_props(element: Arc<Element>) -> Fragments {
    stream::iter(0..element.props.len())
        .filter_map(move |index| {
            let fragment = element
                .props
                .get_index(index)
                .and_then(|(name, value)| render_prop(name, value).transpose());
            future::ready(fragment)
        })
        .boxed()
}

fn render_prop(name: &str, value: &Value) -> Result<Option<String>> {
    if matches!(value, Value::Undefined | Value::Null | Value::Bool(false)) {
        return Ok(None);
    }

    if !is_attribute_name_valid(name) {
        return Err(Error::attribute_name(name));
    }

    let fragment = match value {
        Value::Bool(_) => format!(" {}", name),
        Value::Str(text) if text.is_empty() => format!(" {}=\"\"", name),
        Value::Str(text) => format!(" {}=\"{}\"", name, escape_html_cow(text)),
        Value::Number(n) => format!(" {}=\"{}\"", name, format_number(*n)),
        other => {
            tracing::warn!(
                prop = name,
                value_type = other.type_name(),
                "Unexpected prop value type"
            );
            return Ok(None);
        }
    };
    Ok(Some(fragment))
}
