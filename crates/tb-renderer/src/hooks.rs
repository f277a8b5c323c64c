//! Override hooks for the Markdown renderer.
//!
//! [`MarkdownRenderer`](crate::MarkdownRenderer) handles structure (lists,
//! tables, inline formatting) itself and hands the rendered content of each
//! hookable construct to a [`RenderHooks`] implementation, which returns the
//! markup to emit. Hooks take `&mut self` so an implementation can collect
//! per-document state while rendering.

use crate::util::escape_html;

/// A table cell being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCell {
    /// Whether the cell is in the header row.
    pub header: bool,
    /// Column alignment (`left`, `center`, `right`).
    pub align: Option<&'static str>,
}

/// A block quote being closed.
#[derive(Debug, Clone, Copy)]
pub struct BlockQuote<'a> {
    /// Rendered content.
    pub html: &'a str,
    /// Source text with the `>` markers removed.
    pub source: &'a str,
    /// Whether nothing was rendered before the quote.
    pub leading: bool,
}

/// A code block being closed.
#[derive(Debug, Clone, Copy)]
pub struct CodeBlock<'a> {
    /// First word of the fence info string.
    pub language: Option<&'a str>,
    /// Indented (not fenced) block.
    pub indented: bool,
    /// Raw code.
    pub code: &'a str,
}

/// Markup overrides for hookable Markdown constructs.
///
/// Every method has a plain HTML default.
pub trait RenderHooks {
    /// Error that aborts rendering.
    type Error;

    /// Render a paragraph from its inline content.
    fn paragraph(&mut self, html: &str) -> Result<String, Self::Error> {
        Ok(format!("<p>{html}</p>"))
    }

    /// Render a heading (`level` is 1-6).
    fn heading(&mut self, level: u8, html: &str) -> Result<String, Self::Error> {
        Ok(format!("<h{level}>{html}</h{level}>"))
    }

    /// Render a block quote.
    fn blockquote(&mut self, quote: BlockQuote<'_>) -> Result<String, Self::Error> {
        Ok(format!("<blockquote>{}</blockquote>", quote.html))
    }

    /// Render a raw HTML block from its source lines.
    fn html_block(&mut self, html: &str) -> Result<String, Self::Error> {
        Ok(html.to_owned())
    }

    /// Render a thematic break.
    fn rule(&mut self) -> Result<String, Self::Error> {
        Ok("<hr>".to_owned())
    }

    /// Render a list item from its content.
    fn list_item(&mut self, html: &str) -> Result<String, Self::Error> {
        Ok(format!("<li>{html}</li>"))
    }

    /// Render a table cell from its content.
    fn table_cell(&mut self, html: &str, cell: TableCell) -> Result<String, Self::Error> {
        let tag = if cell.header { "th" } else { "td" };
        Ok(match cell.align {
            Some(align) => format!(r#"<{tag} align="{align}">{html}</{tag}>"#),
            None => format!("<{tag}>{html}</{tag}>"),
        })
    }

    /// Render a link around its rendered text.
    fn link(&mut self, href: &str, title: &str, html: &str) -> Result<String, Self::Error> {
        let title = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, escape_html(title))
        };
        Ok(format!(r#"<a href="{}"{title}>{html}</a>"#, escape_html(href)))
    }

    /// Render an image.
    fn image(&mut self, src: &str, alt: &str, title: &str) -> Result<String, Self::Error> {
        let title = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, escape_html(title))
        };
        Ok(format!(
            r#"<img src="{}" alt="{}"{title}>"#,
            escape_html(src),
            escape_html(alt)
        ))
    }

    /// Render an inline code span.
    fn code_span(&mut self, code: &str) -> Result<String, Self::Error> {
        Ok(format!("<code>{}</code>", escape_html(code)))
    }

    /// Render a fenced or indented code block.
    fn code_block(&mut self, block: CodeBlock<'_>) -> Result<String, Self::Error> {
        let code = escape_html(block.code);
        Ok(match block.language {
            Some(lang) => format!(r#"<pre><code class="language-{lang}">{code}</code></pre>"#),
            None => format!("<pre><code>{code}</code></pre>"),
        })
    }
}
