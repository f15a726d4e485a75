//! Error handling for async-htm
//!
//! Every fatal condition the compiler, evaluator or renderer can hit is a
//! variant of [`Error`]. Rendering is all-or-nothing: the first error aborts
//! the fragment stream at the point it was reached, there is no partial
//! recovery and nothing is retried.
//!
//! # Error Types
//!
//! - [`Error::MalformedElement`] - an element record without a `type`
//! - [`Error::InvalidElementType`] - a `type` that is neither a tag, a fragment nor a component
//! - [`Error::InvalidTagName`] / [`Error::InvalidAttributeName`] - names rejected by the HTML grammars
//! - [`Error::InvalidRoot`] - `render` called with nothing worth rendering
//! - [`Error::InvalidItemType`] - a bare boolean or function reached the renderer
//! - [`Error::InvalidRawResult`] - raw markup that did not resolve to a string (carries its type)
//! - [`Error::UnexpectedNestedArray`] / [`Error::InvalidResult`] - rejected `html` results
//! - [`Error::ComponentError`] - failures raised by user components
//!
//! Unsupported prop value types are deliberately absent: those props are
//! dropped with a `tracing` warning and rendering continues.
//!
//! # Usage
//!
//! ```rust,ignore
//! use async_htm::{html, render_to_string, Error};
//!
//! match render_to_string(html!(["<-div></-div>"])?).await {
//!     Err(Error::InvalidTagName(tag)) => println!("bad tag: {}", tag),
//!     Err(err) => println!("Other error: {}", err),
//!     Ok(markup) => println!("{}", markup),
//! }
//! ```
//!
//! # Memory Efficiency
//!
//! Messages use `Cow<'static, str>` so static messages never allocate. The
//! type is `Clone` because pending values are shared futures whose output
//! (including the error) is handed to every awaiting consumer.

use std::borrow::Cow;
use thiserror::Error;

/// Error type for all async-htm operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An element record has no `type` at all
    ///
    /// Carries a JSON preview of the offending record, cut to 50 characters.
    #[error("Not an element definition. Missing type in: {0}")]
    MalformedElement(Cow<'static, str>),

    /// The element `type` is neither a string nor a component
    #[error("Invalid element type: {0}")]
    InvalidElementType(Cow<'static, str>),

    /// A (lowercased) tag name failed the tag grammar
    #[error("Invalid tag name: {0}")]
    InvalidTagName(Cow<'static, str>),

    /// A prop name failed the attribute-name grammar
    ///
    /// Raised regardless of the prop's value, as long as the value is not
    /// one that is skipped outright (`undefined`, `null`, `false`).
    #[error("Invalid attribute name: {0}")]
    InvalidAttributeName(Cow<'static, str>),

    /// The root handed to `render` was missing, falsy, or not renderable
    #[error("{0}")]
    InvalidRoot(Cow<'static, str>),

    /// A bare renderable item had an unsupported type (boolean, function)
    #[error("Invalid render item type: {0}")]
    InvalidItemType(Cow<'static, str>),

    /// A raw-markup element resolved to something other than a string
    #[error("skipStringEscape can only be used with string results")]
    InvalidRawResult(Cow<'static, str>),

    /// A list turned up where a single value was expected
    #[error("Unexpected nested array value found")]
    UnexpectedNestedArray,

    /// The checked `html` entry point produced an unusable value
    #[error("{0}")]
    InvalidResult(Cow<'static, str>),

    /// A component failed
    #[error("Component error: {0}")]
    ComponentError(Cow<'static, str>),
}

impl Error {
    /// Create an invalid-root error with a static message
    pub fn root_static(msg: &'static str) -> Self {
        Error::InvalidRoot(Cow::Borrowed(msg))
    }

    /// Create an invalid-root error with an owned message
    pub fn root_owned(msg: String) -> Self {
        Error::InvalidRoot(Cow::Owned(msg))
    }

    /// Create an invalid-result error with a static message
    pub fn result_static(msg: &'static str) -> Self {
        Error::InvalidResult(Cow::Borrowed(msg))
    }

    /// Create an invalid-result error with an owned message
    pub fn result_owned(msg: String) -> Self {
        Error::InvalidResult(Cow::Owned(msg))
    }

    /// Create a component error
    ///
    /// Use this from inside components to abort the render.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use async_htm::{Component, Error};
    ///
    /// let strict = Component::new(|props, _children| {
    ///     props.get("name").cloned().ok_or_else(|| Error::component("name is required"))
    /// });
    /// ```
    pub fn component(msg: impl Into<Cow<'static, str>>) -> Self {
        Error::ComponentError(msg.into())
    }

    /// Create a malformed-element error from a preview of the record
    pub(crate) fn malformed(preview: String) -> Self {
        Error::MalformedElement(Cow::Owned(preview.chars().take(50).collect()))
    }

    /// Create an invalid-tag-name error
    pub(crate) fn tag_name(tag: &str) -> Self {
        Error::InvalidTagName(Cow::Owned(tag.to_string()))
    }

    /// Create an invalid-attribute-name error
    pub(crate) fn attribute_name(name: &str) -> Self {
        Error::InvalidAttributeName(Cow::Owned(name.to_string()))
    }
}

/// Result type alias for async-htm operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::root_static("Expected an argument");
        assert_eq!(err.to_string(), "Expected an argument");

        let err = Error::tag_name("-div");
        assert_eq!(err.to_string(), "Invalid tag name: -div");

        let err = Error::attribute_name("a b");
        assert_eq!(err.to_string(), "Invalid attribute name: a b");

        assert_eq!(
            Error::UnexpectedNestedArray.to_string(),
            "Unexpected nested array value found"
        );
    }

    #[test]
    fn test_malformed_preview_is_truncated() {
        let err = Error::malformed("x".repeat(80));
        match &err {
            Error::MalformedElement(preview) => assert_eq!(preview.chars().count(), 50),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err
            .to_string()
            .starts_with("Not an element definition. Missing type in: xxxx"));
    }

    #[test]
    fn test_component_error_accepts_static_and_owned() {
        let a = Error::component("boom");
        let b = Error::component(format!("bo{}", "om"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Component error: boom");
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = Error::InvalidItemType(Cow::Borrowed("boolean"));
        let copy = err.clone();
        assert_eq!(err, copy);
        assert_eq!(copy.to_string(), "Invalid render item type: boolean");
    }
}
