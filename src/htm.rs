//! Template functions bound to an element factory
//!
//! An [`Htm`] pairs an [`ElementFactory`] with a compile cache. Calling it
//! with a template's [`Statics`] and values compiles the statics once per
//! call site (and per factory), then evaluates them into a [`Value`] tree.
//!
//! [`h`] is the default factory: it builds plain [`Element`] records.
//! [`html`] runs the `h`-bound default and checks that the result is
//! something worth rendering.
//!
//! ```rust,ignore
//! use async_htm::{html, render_to_string};
//!
//! let name = "World";
//! let page = html!(["<p class=\"greeting\">Hello, ", "!</p>"], name)?;
//! assert_eq!(
//!     render_to_string(page).await?,
//!     "<p class=\"greeting\">Hello, World!</p>"
//! );
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::builder::HtmBuilder;
use crate::cache::{TemplateCache, TemplateCacheKey};
use crate::compiler::{CompiledTemplate, Compiler};
use crate::error::{Error, Result};
use crate::evaluator::{ElementFactory, Evaluator, NodeContext};
use crate::types::{CacheMode, Component, Element, ElementType, Props, Statics, TemplateConfig};
use crate::utils::format_number;
use crate::value::Value;

static NEXT_FACTORY: AtomicU64 = AtomicU64::new(1);

/// Identity of one bound factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactoryId(u64);

impl FactoryId {
    pub(crate) fn next() -> Self {
        FactoryId(NEXT_FACTORY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

struct HtmInner {
    id: FactoryId,
    factory: Box<dyn ElementFactory>,
    cache: Arc<TemplateCache>,
    config: TemplateConfig,
}

impl Drop for HtmInner {
    fn drop(&mut self) {
        // Folded values in these entries came from this factory.
        self.cache.remove_factory(self.id);
    }
}

/// A template function bound to an element factory
///
/// Cheap to clone; clones share the factory and its cache entries.
#[derive(Clone)]
pub struct Htm {
    inner: Arc<HtmInner>,
}

impl Htm {
    /// Bind a factory closure, using the global cache and default config
    ///
    /// ```rust,ignore
    /// use async_htm::{Htm, NodeContext, Props, Value};
    ///
    /// let tags = Htm::new(|_node: &mut NodeContext, tag: Value, _props: Option<Props>, _children: Vec<Value>| tag);
    /// ```
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&mut NodeContext, Value, Option<Props>, Vec<Value>) -> Value + Send + Sync + 'static,
    {
        Self::builder().with_factory(factory).build()
    }

    /// Bind any [`ElementFactory`] implementation
    pub fn with_factory<E: ElementFactory + 'static>(factory: E) -> Self {
        Self::builder().with_factory(factory).build()
    }

    pub fn builder() -> HtmBuilder {
        HtmBuilder::new()
    }

    pub(crate) fn from_parts(
        factory: Box<dyn ElementFactory>,
        config: TemplateConfig,
        cache: Arc<TemplateCache>,
    ) -> Self {
        Self {
            inner: Arc::new(HtmInner {
                id: FactoryId::next(),
                factory,
                cache,
                config,
            }),
        }
    }

    pub fn id(&self) -> FactoryId {
        self.inner.id
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.inner.config
    }

    /// The compiled form of `statics`, from the cache when enabled
    pub fn compiled(&self, statics: &Statics<'_>) -> Arc<CompiledTemplate> {
        match self.inner.config.cache_mode() {
            CacheMode::None => Compiler::compile(statics.parts()),
            CacheMode::Normal => {
                let key = TemplateCacheKey::new(self.inner.id, statics.id().clone());
                self.inner
                    .cache
                    .get_or_compile_template(&key, || Compiler::compile(statics.parts()))
            }
        }
    }

    /// Build the value tree for one template invocation
    pub fn call(&self, statics: &Statics<'_>, values: &[Value]) -> Value {
        let template = self.compiled(statics);
        Evaluator::new(&template, self.inner.factory.as_ref())
            .with_static_folding(self.inner.config.fold_static_subtrees())
            .evaluate(values)
    }
}

impl fmt::Debug for Htm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Htm")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Build an element record
///
/// Missing props become an empty map. Nothing is validated here; invalid
/// types and names are reported when the element is rendered.
pub fn h(element_type: impl Into<ElementType>, props: Option<Props>, children: Vec<Value>) -> Element {
    Element::new(element_type, props.unwrap_or_default(), children)
}

/// The default factory: [`h`], shared behind an `Arc`
pub fn element_factory(
    _node: &mut NodeContext,
    tag: Value,
    props: Option<Props>,
    children: Vec<Value>,
) -> Value {
    Value::Element(Arc::new(h(tag, props, children)))
}

static DEFAULT_HTM: Lazy<Htm> = Lazy::new(|| Htm::new(element_factory));

/// The `h`-bound template function behind [`html`]
pub fn default_htm() -> &'static Htm {
    &DEFAULT_HTM
}

/// Evaluate a template with [`h`] and check the result
///
/// Multiple roots are flattened one level into a list. Each root must be a
/// string, a number (converted to its decimal string), a falsy value
/// (converted to `""`), an element with a string or component type, or a
/// pending value resolving to one of those.
pub fn html(statics: &Statics<'_>, values: &[Value]) -> Result<Value> {
    match DEFAULT_HTM.call(statics, values) {
        Value::List(roots) => flatten_once(roots)
            .into_iter()
            .map(check_root)
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        root => check_root(root),
    }
}

fn check_root(value: Value) -> Result<Value> {
    match value {
        Value::Number(n) => Ok(Value::Str(format_number(n))),
        value if value.is_falsy() => Ok(Value::Str(String::new())),
        Value::Str(text) => Ok(Value::Str(text)),
        Value::List(_) => Err(Error::UnexpectedNestedArray),
        Value::Element(element) => check_element(element),
        Value::Object(map) => check_element(Arc::new(Element::from_object(&map))),
        Value::Pending(pending) => Ok(Value::try_pending(async move {
            check_root(pending.resolve().await?)
        })),
        // A lazy sequence is an object without a `type`.
        Value::Items(_) => Err(Error::result_static(
            "Resolved to invalid type of object value \"type\" property: undefined",
        )),
        other => Err(Error::result_owned(format!(
            "Resolved to invalid value type: {}",
            other.type_name()
        ))),
    }
}

fn check_element(element: Arc<Element>) -> Result<Value> {
    let renderable = matches!(
        element.element_type,
        ElementType::Tag(_) | ElementType::Fragment | ElementType::Component(_)
    );
    if !renderable {
        return Err(Error::result_owned(format!(
            "Resolved to invalid type of object value \"type\" property: {}",
            element.element_type.type_name()
        )));
    }

    if !element.children.iter().any(|child| matches!(child, Value::List(_))) {
        return Ok(Value::Element(element));
    }

    let mut flat = Element::clone(&element);
    flat.children = flatten_once(flat.children);
    Ok(Value::Element(Arc::new(flat)))
}

fn flatten_once(values: Vec<Value>) -> Vec<Value> {
    let mut flat = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::List(items) => flat.extend(items),
            other => flat.push(other),
        }
    }
    flat
}

/// Markup that is emitted without escaping
pub fn raw_html(markup: &str) -> Element {
    raw_markup(markup.to_string())
}

/// Raw markup assembled from template parts and values
///
/// Values are joined in by their string form; they are not escaped.
pub fn raw_html_parts(parts: &[&str], values: &[Value]) -> Element {
    let mut markup = String::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            if let Some(value) = values.get(index - 1) {
                markup.push_str(&value.to_js_string());
            }
        }
        markup.push_str(part);
    }
    raw_markup(markup)
}

fn raw_markup(markup: String) -> Element {
    let component = Component::named("raw_html", move |_, _| Ok(Value::Str(markup.clone())));
    Element {
        element_type: ElementType::Component(component),
        props: Props::new(),
        children: Vec::new(),
        skip_string_escape: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TemplateCache;
    use serde_json::json;

    fn statics<'a>(id: &'static str, parts: &'a [&'a str]) -> Statics<'a> {
        Statics::new(id, parts)
    }

    #[test]
    fn test_h_defaults_props() {
        let element = h("div", None, vec![]);
        assert_eq!(element.tag(), Some("div"));
        assert!(element.props.is_empty());
        assert!(!element.skip_string_escape);
    }

    #[test]
    fn test_html_single_root() {
        let result = html(&statics("htm:single", &["<div />"]), &[]).unwrap();
        assert_eq!(result.to_json(), json!({ "type": "div", "props": {}, "children": [] }));
    }

    #[test]
    fn test_html_text_and_multi_root() {
        let parts = ["", "bar"];
        let result = html(&statics("htm:multi-text", &parts), &[Value::from("foo")]).unwrap();
        assert_eq!(result, Value::List(vec![Value::from("foo"), Value::from("bar")]));

        let result = html(&statics("htm:combined", &["<div />foo"]), &[]).unwrap();
        assert_eq!(
            result.to_json(),
            json!([{ "type": "div", "props": {}, "children": [] }, "foo"])
        );
    }

    #[test]
    fn test_html_scalar_roots() {
        let parts = ["", ""];
        let at = statics("htm:scalar", &parts);
        assert_eq!(html(&at, &[Value::from(123)]).unwrap(), Value::from("123"));
        assert_eq!(html(&at, &[Value::from(0)]).unwrap(), Value::from("0"));
        assert_eq!(html(&at, &[Value::Undefined]).unwrap(), Value::from(""));
        assert_eq!(html(&at, &[Value::Null]).unwrap(), Value::from(""));
        assert_eq!(html(&at, &[Value::from(false)]).unwrap(), Value::from(""));
    }

    #[test]
    fn test_html_top_level_list_is_flattened() {
        let div = Value::from(h("div", None, vec![]));
        let parts = ["", "<span />"];
        let result = html(
            &statics("htm:top-list", &parts),
            &[Value::List(vec![div.clone(), div])],
        )
        .unwrap();
        match result {
            Value::List(roots) => assert_eq!(roots.len(), 3),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_html_rejects_invalid_roots() {
        let parts = ["", ""];
        let at = statics("htm:invalid", &parts);

        let err = html(&at, &[Value::from(true)]).unwrap_err();
        assert_eq!(err.to_string(), "Resolved to invalid value type: boolean");

        let err = html(&at, &[Value::Object(Props::new())]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Resolved to invalid type of object value \"type\" property: undefined"
        );

        let component = Component::new(|_, _| Ok(Value::Undefined));
        let err = html(&at, &[Value::from(component)]).unwrap_err();
        assert_eq!(err.to_string(), "Resolved to invalid value type: function");

        let items = Value::iter(vec![Value::from("a")]);
        let err = html(&at, &[items]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Resolved to invalid type of object value \"type\" property: undefined"
        );

        let parts = ["foo", ""];
        let err = html(&statics("htm:invalid-multi", &parts), &[Value::from(true)]).unwrap_err();
        assert_eq!(err.to_string(), "Resolved to invalid value type: boolean");
    }

    #[tokio::test]
    async fn test_html_pending_resolving_to_list_fails() {
        let parts = ["", ""];
        let pending = Value::pending(async { vec!["a", "b"] });
        let result = html(&statics("htm:pending", &parts), &[pending]).unwrap();
        let Value::Pending(pending) = result else { panic!("expected pending") };
        assert_eq!(pending.resolve().await, Err(Error::UnexpectedNestedArray));
    }

    #[test]
    fn test_html_flattens_element_children() {
        let items = Value::List(vec![Value::from("a"), Value::from("b")]);
        let parts = ["<ul>", "</ul>"];
        let result = html(&statics("htm:flatten-children", &parts), &[items]).unwrap();
        let element = result.as_element().unwrap();
        assert_eq!(element.children, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_raw_html_parts() {
        let element = raw_html_parts(&["<b>", "</b>"], &[Value::from(1)]);
        assert!(element.skip_string_escape);
        let ElementType::Component(component) = &element.element_type else {
            panic!("expected component type")
        };
        assert_eq!(component.call(&Props::new(), &[]), Ok(Value::from("<b>1</b>")));
    }

    #[test]
    fn test_no_caching_compiles_every_call() {
        let htm = Htm::builder().no_caching().build();
        let parts = ["<p></p>"];
        let at = statics("htm:no-cache", &parts);
        assert!(!Arc::ptr_eq(&htm.compiled(&at), &htm.compiled(&at)));
    }

    #[test]
    fn test_drop_purges_factory_entries() {
        let cache = Arc::new(TemplateCache::new());
        let htm = Htm::builder().with_cache(Arc::clone(&cache)).build();
        let parts = ["<p></p>"];
        htm.call(&statics("htm:purge", &parts), &[]);
        assert_eq!(cache.get_stats().total_entries(), 1);

        drop(htm);
        assert_eq!(cache.get_stats().total_entries(), 0);
    }
}
