//! Tagged-template HTML with an async, order-preserving streaming renderer
//!
//! A template is written as its static parts plus interpolated values. The
//! static parts are compiled once per call site into an instruction list;
//! every call replays that list against the values, building a tree of
//! [`Element`]s (or whatever a custom [`ElementFactory`] builds). Subtrees
//! that depend on no value are built once and reused.
//!
//! The tree is then rendered into a lazy stream of escaped HTML fragments.
//! Components, pending values and async streams inside the tree are resolved
//! as the renderer reaches them, and output always follows source order.
//!
//! # Examples
//!
//! ```rust,ignore
//! use async_htm::{html, render_to_string, Component, Value};
//!
//! # async fn example() -> async_htm::Result<()> {
//! let card = Component::new(|props, children| {
//!     let title = props.get("title").cloned().unwrap_or_default();
//!     html!(["<section><h2>", "</h2>", "</section>"], title, children.to_vec())
//! });
//!
//! let page = html!(
//!     ["<main><", " title=", ">Hello, ", "!<//></main>"],
//!     card,
//!     "Greetings",
//!     Value::pending(async { "World" })
//! )?;
//!
//! assert_eq!(
//!     render_to_string(page).await?,
//!     "<main><section><h2>Greetings</h2>Hello, World!</section></main>"
//! );
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod htm;
pub mod parser;
pub mod predicates;
pub mod renderer;
pub mod streaming;
pub mod types;
pub mod utils;
pub mod value;


// Re-export commonly used types
pub use builder::HtmBuilder;
pub use cache::{
    clear_global_cache, get_global_cache, get_global_cache_stats, init_global_cache,
    init_global_cache_with_config, CacheConfig, EvictionStrategy, TemplateCache,
};
pub use compiler::{CompiledTemplate, Compiler};
pub use error::{Error, Result};
pub use evaluator::{ElementFactory, NodeContext, NodeKey};
pub use htm::{default_htm, element_factory, h, html, raw_html, raw_html_parts, FactoryId, Htm};
pub use predicates::{is_attribute_name_valid, is_tag_valid, is_void_tag, VOID_TAGS};
pub use renderer::Renderer;
pub use streaming::{fragments_to_string, render, render_to_string, render_with_config, RenderStream};
pub use types::{
    AsyncComponent, CacheMode, Component, Element, ElementType, IntoProps, Props, RenderConfig,
    Statics, TemplateConfig, TemplateId,
};
pub use value::{Items, Pending, Value};

pub use async_trait::async_trait;

#[cfg(feature = "derive")]
pub use async_htm_macros::IntoProps;

/// Static parts of a template, identified by the invocation site
///
/// The id combines the calling package, module and source position. Parts
/// must be string literals so one site always denotes the same template.
///
/// ```rust,ignore
/// let statics = async_htm::statics!["<p>", "</p>"];
/// ```
#[macro_export]
macro_rules! statics {
    [$($part:literal),* $(,)?] => {
        $crate::Statics::new(
            $crate::TemplateId::call_site(concat!(
                env!("CARGO_PKG_NAME"),
                "::",
                module_path!(),
                "@",
                file!(),
                ":",
                line!(),
                ":",
                column!()
            )),
            &[$($part),*],
        )
    };
}

/// Evaluate a template with [`h`] and check the result
///
/// The first argument lists the static parts; the values follow. Each value
/// is converted with `Value::from`.
///
/// ```rust,ignore
/// let list = async_htm::html!(["<ul>", "</ul>"], items)?;
/// ```
#[macro_export]
macro_rules! html {
    ([$($part:literal),* $(,)?] $(, $value:expr)* $(,)?) => {
        $crate::html(
            &$crate::statics![$($part),*],
            &[$($crate::Value::from($value)),*],
        )
    };
}

/// Raw, unescaped markup
///
/// ```rust,ignore
/// let icon = async_htm::raw_html!(["<svg width=\"", "\"></svg>"], 16);
/// ```
#[macro_export]
macro_rules! raw_html {
    ([$($part:expr),* $(,)?] $(, $value:expr)* $(,)?) => {
        $crate::raw_html_parts(&[$($part),*], &[$($crate::Value::from($value)),*])
    };
    ($markup:expr) => {
        $crate::raw_html($markup)
    };
}
