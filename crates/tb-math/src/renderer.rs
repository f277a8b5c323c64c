//! The equation rendering capability.

use std::future::Future;
use std::sync::Arc;

use crate::cache::EquationCache;
use crate::error::MathError;
use crate::key::EquationKey;

/// Renders one TeX expression to a markup fragment.
///
/// Called once per distinct `(source, inline)` pair of a document, in the
/// order placeholders appear. Implementations decide their own timeout policy.
pub trait EquationRenderer: Send + Sync {
    /// Render `source` in inline or display mode.
    fn render(
        &self,
        source: &str,
        inline: bool,
    ) -> impl Future<Output = Result<String, MathError>> + Send;
}

impl<R: EquationRenderer> EquationRenderer for Arc<R> {
    fn render(
        &self,
        source: &str,
        inline: bool,
    ) -> impl Future<Output = Result<String, MathError>> + Send {
        (**self).render(source, inline)
    }
}

/// Emits TeX wrapped in MathJax-style delimiters for client-side typesetting.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedTexRenderer;

impl EquationRenderer for DelimitedTexRenderer {
    async fn render(&self, source: &str, inline: bool) -> Result<String, MathError> {
        let escaped = escape_text(source);
        Ok(if inline {
            format!(r#"<span class="math">\({escaped}\)</span>"#)
        } else {
            format!(r#"<span class="math display">\[{escaped}\]</span>"#)
        })
    }
}

/// Memoizes another renderer through an [`EquationCache`].
///
/// Failures are not cached, so a broken expression is retried on the next
/// build.
pub struct CachedRenderer<R> {
    inner: R,
    cache: Box<dyn EquationCache>,
}

impl<R: EquationRenderer> CachedRenderer<R> {
    /// Wrap `inner`, storing its results in `cache`.
    #[must_use]
    pub fn new(inner: R, cache: Box<dyn EquationCache>) -> Self {
        Self { inner, cache }
    }

    /// The wrapped renderer.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: EquationRenderer> EquationRenderer for CachedRenderer<R> {
    async fn render(&self, source: &str, inline: bool) -> Result<String, MathError> {
        let key = EquationKey { source, inline };
        if let Some(markup) = self.cache.get(&key) {
            tracing::trace!(source, inline, "equation cache hit");
            return Ok(markup);
        }

        let markup = self.inner.render(source, inline).await?;
        self.cache.set(&key, &markup);
        Ok(markup)
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::MemoryEquationCache;

    /// Counts calls and fails on expressions containing `bad`.
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    impl EquationRenderer for CountingRenderer {
        async fn render(&self, source: &str, inline: bool) -> Result<String, MathError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if source.contains("bad") {
                return Err(MathError::Invalid(format!("cannot parse {source}")));
            }
            Ok(format!("<svg data-inline=\"{inline}\">{source}</svg>"))
        }
    }

    #[tokio::test]
    async fn test_delimited_tex_inline_and_display() {
        let inline = DelimitedTexRenderer.render("a<b", true).await.unwrap();
        assert_eq!(inline, r#"<span class="math">\(a&lt;b\)</span>"#);

        let display = DelimitedTexRenderer.render("x", false).await.unwrap();
        assert_eq!(display, r#"<span class="math display">\[x\]</span>"#);
    }

    #[tokio::test]
    async fn test_cached_renderer_memoizes_by_key() {
        let renderer = CachedRenderer::new(
            CountingRenderer {
                calls: AtomicUsize::new(0),
            },
            Box::new(MemoryEquationCache::new()),
        );

        renderer.render("x", true).await.unwrap();
        renderer.render("x", true).await.unwrap();
        assert_eq!(renderer.inner().calls.load(Ordering::SeqCst), 1);

        // Same expression in display mode is a different key
        renderer.render("x", false).await.unwrap();
        assert_eq!(renderer.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_renderer_does_not_cache_failures() {
        let renderer = CachedRenderer::new(
            CountingRenderer {
                calls: AtomicUsize::new(0),
            },
            Box::new(MemoryEquationCache::new()),
        );

        assert!(renderer.render("bad", true).await.is_err());
        assert!(renderer.render("bad", true).await.is_err());
        assert_eq!(renderer.inner().calls.load(Ordering::SeqCst), 2);
    }
}
