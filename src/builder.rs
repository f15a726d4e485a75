//! Builder pattern API for constructing Htm instances
//!
//! This module provides a fluent API for binding an element factory to a
//! compile cache and a [`TemplateConfig`].

use std::sync::Arc;

use crate::cache::{get_global_cache, TemplateCache};
use crate::evaluator::{ElementFactory, NodeContext};
use crate::htm::{element_factory, Htm};
use crate::types::{CacheMode, Props, TemplateConfig};
use crate::value::Value;

/// Builder for constructing [`Htm`] instances
///
/// # Examples
///
/// ```rust,ignore
/// use async_htm::{CacheMode, HtmBuilder};
///
/// let htm = HtmBuilder::new()
///     .with_factory_fn(|node, tag, props, children| {
///         node.mark_dynamic();
///         async_htm::element_factory(node, tag, props, children)
///     })
///     .with_cache_mode(CacheMode::Normal)
///     .build();
/// ```
pub struct HtmBuilder {
    factory: Option<Box<dyn ElementFactory>>,
    config: TemplateConfig,
    cache: Option<Arc<TemplateCache>>,
}

impl HtmBuilder {
    pub fn new() -> Self {
        Self {
            factory: None,
            config: TemplateConfig::default(),
            cache: None,
        }
    }

    /// Use a custom element factory instead of [`h`](crate::h)
    pub fn with_factory<E: ElementFactory + 'static>(mut self, factory: E) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Like [`with_factory`](Self::with_factory), with closure argument types inferred
    pub fn with_factory_fn<F>(self, factory: F) -> Self
    where
        F: Fn(&mut NodeContext, Value, Option<Props>, Vec<Value>) -> Value + Send + Sync + 'static,
    {
        self.with_factory(factory)
    }

    /// Use a custom template configuration
    pub fn with_config(mut self, config: TemplateConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.config = self.config.with_cache_mode(mode);
        self
    }

    pub fn with_static_folding(mut self, enabled: bool) -> Self {
        self.config = self.config.with_static_folding(enabled);
        self
    }

    /// Use a custom cache instance instead of the global cache
    pub fn with_cache(mut self, cache: Arc<TemplateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Configure for no caching (useful for one-off templates)
    pub fn no_caching(mut self) -> Self {
        self.config = TemplateConfig::no_caching();
        self
    }

    pub fn build(self) -> Htm {
        let factory = self
            .factory
            .unwrap_or_else(|| Box::new(element_factory) as Box<dyn ElementFactory>);
        let cache = self.cache.unwrap_or_else(get_global_cache);
        Htm::from_parts(factory, self.config, cache)
    }
}

impl Default for HtmBuilder {
    fn default() -> Self {
        Self::new()
    }
}
