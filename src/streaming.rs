//! Render entry points and fragment aggregation
//!
//! [`render`] returns a [`RenderStream`]: a `Stream` of fragments that can
//! be forwarded as they arrive (to a response body, say), drained in chunks,
//! or concatenated with [`render_to_string`]. Dropping the stream cancels
//! the render; nothing runs in the background.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{Stream, StreamExt, TryStream, TryStreamExt};

use crate::error::{Error, Result};
use crate::renderer::{Fragments, Renderer};
use crate::types::RenderConfig;
use crate::value::Value;

/// An ordered stream of rendered HTML fragments
///
/// The stream ends after the first error.
pub struct RenderStream {
    fragments: Fragments,
    buffer_size: usize,
    finished: bool,
}

impl RenderStream {
    fn new(fragments: Fragments, config: RenderConfig) -> Self {
        Self {
            fragments,
            buffer_size: config.buffer_size(),
            finished: false,
        }
    }

    /// Set the number of fragments per chunk
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Collect all fragments into a vector
    pub async fn collect_all(self) -> Result<Vec<String>> {
        self.fragments.try_collect().await
    }

    /// Get the next chunk of up to `buffer_size` fragments
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }

        let mut chunk = Vec::with_capacity(self.buffer_size);
        while chunk.len() < self.buffer_size {
            match self.next().await {
                Some(fragment) => chunk.push(fragment?),
                None => break,
            }
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }

    /// Process fragments in chunks with a callback
    pub async fn for_each_chunk<F>(mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&[String]) -> Result<()>,
    {
        while let Some(chunk) = self.next_chunk().await? {
            callback(&chunk)?;
        }
        Ok(())
    }

    /// Concatenate every fragment
    pub async fn into_string(self) -> Result<String> {
        fragments_to_string(self.fragments).await
    }
}

impl Stream for RenderStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let polled = self.fragments.poll_next_unpin(cx);
        if let Poll::Ready(None | Some(Err(_))) = polled {
            self.finished = true;
        }
        polled
    }
}

/// Render a value with the default configuration
///
/// Validation of the root happens on the first poll; a bad root yields a
/// single error item.
pub fn render(item: impl Into<Value>) -> RenderStream {
    render_with_config(item, RenderConfig::default())
}

pub fn render_with_config(item: impl Into<Value>, config: RenderConfig) -> RenderStream {
    let fragments = Renderer::new(config).render_root(item.into());
    RenderStream::new(fragments, config)
}

/// Render a value into one string
pub async fn render_to_string(item: impl Into<Value>) -> Result<String> {
    render(item).into_string().await
}

/// Concatenate fragments in order, stopping at the first error
pub async fn fragments_to_string<S>(fragments: S) -> Result<String>
where
    S: TryStream<Ok = String, Error = Error>,
{
    fragments
        .try_fold(String::new(), |mut markup, fragment| async move {
            markup.push_str(&fragment);
            Ok(markup)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::htm::h;
    use futures::stream;

    fn list_of(count: usize) -> Value {
        let items = (0..count)
            .map(|i| Value::from(h("li", None, vec![Value::from(i)])))
            .collect::<Vec<_>>();
        Value::from(h("ul", None, items))
    }

    #[tokio::test]
    async fn test_render_to_string() {
        assert_eq!(
            render_to_string(list_of(2)).await.unwrap(),
            "<ul><li>0</li><li>1</li></ul>"
        );
    }

    #[tokio::test]
    async fn test_root_rules() {
        assert_eq!(
            render_to_string(Value::Undefined).await.unwrap_err().to_string(),
            "Expected an argument"
        );
        assert_eq!(
            render_to_string(Value::Null).await.unwrap_err().to_string(),
            "Expected a non-falsy argument, got: null"
        );
        assert_eq!(
            render_to_string(0).await.unwrap_err().to_string(),
            "Expected a non-falsy argument, got: 0"
        );
        assert_eq!(
            render_to_string(42).await.unwrap_err().to_string(),
            "Expected a string or an object, got: number"
        );
        assert_eq!(
            render_to_string(true).await.unwrap_err().to_string(),
            "Expected a string or an object, got: boolean"
        );
    }

    #[tokio::test]
    async fn test_pending_root_is_awaited() {
        let root = Value::pending(async { "<late>" });
        assert_eq!(render_to_string(root).await.unwrap(), "&lt;late&gt;");

        let root = Value::pending(async { Value::Undefined });
        assert_eq!(
            render_to_string(root).await,
            Err(Error::root_static("Expected an argument"))
        );
    }

    #[tokio::test]
    async fn test_root_list_members_use_root_rules() {
        let root = Value::List(vec![Value::from("a"), Value::Null]);
        assert_eq!(
            render_to_string(root).await.unwrap_err().to_string(),
            "Expected a non-falsy argument, got: null"
        );
    }

    #[tokio::test]
    async fn test_collect_all_keeps_fragments() {
        let fragments = render(h("p", None, vec![Value::from("x")])).collect_all().await.unwrap();
        assert_eq!(fragments, vec!["<p", ">", "x", "</p>"]);
    }

    #[tokio::test]
    async fn test_chunked_processing() {
        let stream = render_with_config(list_of(10), RenderConfig::default().with_buffer_size(3));

        let mut chunk_count = 0;
        let mut markup = String::new();
        stream
            .for_each_chunk(|chunk| {
                chunk_count += 1;
                assert!(chunk.len() <= 3);
                markup.push_str(&chunk.concat());
                Ok(())
            })
            .await
            .unwrap();

        assert!(chunk_count > 3);
        assert!(markup.starts_with("<ul><li>0</li>"));
        assert!(markup.ends_with("<li>9</li></ul>"));
    }

    #[tokio::test]
    async fn test_next_chunk_ends_with_none() {
        let mut stream = render("text").with_buffer_size(8);
        assert_eq!(stream.next_chunk().await.unwrap(), Some(vec!["text".to_string()]));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fragments_to_string_stops_at_first_error() {
        let fragments = stream::iter(vec![
            Ok("a".to_string()),
            Err(Error::component("stop")),
            Ok("b".to_string()),
        ]);
        assert_eq!(
            fragments_to_string(fragments).await,
            Err(Error::component("stop"))
        );
    }

    #[tokio::test]
    async fn test_render_stream_ends_after_error() {
        let element = h("p", None, vec![Value::from(true), Value::from("after")]);
        let fragments: Vec<_> = render(element).collect().await;
        assert_eq!(
            fragments,
            vec![
                Ok("<p".to_string()),
                Ok(">".to_string()),
                Err(Error::InvalidItemType("boolean".into())),
            ]
        );
    }

    #[tokio::test]
    async fn test_render_stream_is_a_stream() {
        let fragments: Vec<_> = render("a&b").collect().await;
        assert_eq!(fragments, vec![Ok("a&amp;b".to_string())]);
    }
}
