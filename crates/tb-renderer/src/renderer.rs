//! Markdown renderer with pluggable hooks.

use std::fmt::Write;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::hooks::{BlockQuote, CodeBlock, RenderHooks, TableCell};
use crate::state::{CodeBlockState, ImageState, TableState};
use crate::util::{escape_html, heading_level_to_num};

/// Markdown extensions understood by the dialect: tables and strikethrough.
pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
}

/// Construct whose content is buffered until its end event.
enum Block {
    Paragraph,
    Heading(u8),
    BlockQuote(Range<usize>),
    Item,
    Cell,
    Link { href: String, title: String },
    Html,
}

struct Frame {
    block: Block,
    html: String,
}

/// Markdown renderer delegating hookable constructs to [`RenderHooks`].
///
/// Content of paragraphs, headings, quotes, list items, table cells and
/// links is rendered into a buffer first and passed to the hook when the
/// construct ends, so hooks always see complete inline markup.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
/// use tb_renderer::{MarkdownRenderer, RenderHooks};
///
/// struct Shout;
///
/// impl RenderHooks for Shout {
///     type Error = Infallible;
///
///     fn paragraph(&mut self, html: &str) -> Result<String, Infallible> {
///         Ok(format!("<p>{}</p>", html.to_uppercase()))
///     }
/// }
///
/// let html = MarkdownRenderer::new(&mut Shout).render("hello *there*").unwrap();
/// assert_eq!(html, "<p>HELLO <EM>THERE</EM></p>");
/// ```
pub struct MarkdownRenderer<'h, H: RenderHooks> {
    hooks: &'h mut H,
    output: String,
    frames: Vec<Frame>,
    code: CodeBlockState,
    table: TableState,
    image: ImageState,
}

impl<'h, H: RenderHooks> MarkdownRenderer<'h, H> {
    /// Create a renderer calling `hooks`.
    pub fn new(hooks: &'h mut H) -> Self {
        Self {
            hooks,
            output: String::with_capacity(4096),
            frames: Vec::new(),
            code: CodeBlockState::default(),
            table: TableState::default(),
            image: ImageState::default(),
        }
    }

    /// Render Markdown source to HTML.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by a hook.
    pub fn render(mut self, source: &str) -> Result<String, H::Error> {
        let parser = Parser::new_ext(source, parser_options()).into_offset_iter();
        for (event, range) in parser {
            self.process_event(event, range, source)?;
        }
        // Only reachable with unbalanced events
        while let Some(frame) = self.frames.pop() {
            self.out().push_str(&frame.html);
        }
        Ok(self.output)
    }

    /// Buffer receiving content at the current position.
    fn out(&mut self) -> &mut String {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.html,
            None => &mut self.output,
        }
    }

    fn push_frame(&mut self, block: Block) {
        self.frames.push(Frame {
            block,
            html: String::new(),
        });
    }

    fn process_event(
        &mut self,
        event: Event<'_>,
        range: Range<usize>,
        source: &str,
    ) -> Result<(), H::Error> {
        match event {
            Event::Start(tag) => self.start_tag(tag, range)?,
            Event::End(tag) => self.end_tag(tag, source)?,
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code)?,
            Event::Html(html) | Event::InlineHtml(html) => {
                if !self.image.is_active() {
                    self.out().push_str(&html);
                }
            }
            Event::SoftBreak => {
                if self.image.is_active() {
                    self.image.push_str(" ");
                } else {
                    self.out().push('\n');
                }
            }
            Event::HardBreak => self.out().push_str("<br>"),
            Event::Rule => {
                let html = self.hooks.rule()?;
                self.out().push_str(&html);
            }
            Event::TaskListMarker(checked) => {
                let html = if checked {
                    r#"<input type="checkbox" checked disabled> "#
                } else {
                    r#"<input type="checkbox" disabled> "#
                };
                self.out().push_str(html);
            }
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not enabled
            }
        }
        Ok(())
    }

    fn start_tag(&mut self, tag: Tag<'_>, range: Range<usize>) -> Result<(), H::Error> {
        match tag {
            Tag::Paragraph => self.push_frame(Block::Paragraph),
            Tag::Heading { level, .. } => {
                self.push_frame(Block::Heading(heading_level_to_num(level)));
            }
            Tag::BlockQuote(_) => self.push_frame(Block::BlockQuote(range)),
            Tag::CodeBlock(kind) => match kind {
                CodeBlockKind::Fenced(info) => {
                    let language = info.split_whitespace().next().map(str::to_owned);
                    self.code.start(language, false);
                }
                CodeBlockKind::Indented => self.code.start(None, true),
            },
            Tag::List(start) => match start {
                Some(1) => self.out().push_str("<ol>"),
                Some(n) => write!(self.out(), r#"<ol start="{n}">"#).unwrap(),
                None => self.out().push_str("<ul>"),
            },
            Tag::Item => self.push_frame(Block::Item),
            Tag::HtmlBlock => self.push_frame(Block::Html),
            Tag::FootnoteDefinition(_) | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.out().push_str("<dl>"),
            Tag::DefinitionListTitle => self.out().push_str("<dt>"),
            Tag::DefinitionListDefinition => self.out().push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.out().push_str("<table>");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.out().push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.out().push_str("<tr>");
            }
            Tag::TableCell => self.push_frame(Block::Cell),
            Tag::Emphasis => self.inline_tag("<em>"),
            Tag::Strong => self.inline_tag("<strong>"),
            Tag::Strikethrough => self.inline_tag("<del>"),
            Tag::Superscript => self.inline_tag("<sup>"),
            Tag::Subscript => self.inline_tag("<sub>"),
            Tag::Link {
                dest_url, title, ..
            } => self.push_frame(Block::Link {
                href: dest_url.into_string(),
                title: title.into_string(),
            }),
            Tag::Image {
                dest_url, title, ..
            } => self.image.start(dest_url.into_string(), title.into_string()),
        }
        Ok(())
    }

    fn end_tag(&mut self, tag: TagEnd, source: &str) -> Result<(), H::Error> {
        match tag {
            TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::Item
            | TagEnd::TableCell
            | TagEnd::Link
            | TagEnd::HtmlBlock => self.close_frame(source)?,
            TagEnd::CodeBlock => {
                let (language, indented, code) = self.code.end();
                let html = self.hooks.code_block(CodeBlock {
                    language: language.as_deref(),
                    indented,
                    code: &code,
                })?;
                self.out().push_str(&html);
            }
            TagEnd::List(ordered) => {
                self.out().push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::FootnoteDefinition | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.out().push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.out().push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.out().push_str("</dd>"),
            TagEnd::Table => self.out().push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.out().push_str("</tr></thead><tbody>");
                self.table.end_head();
            }
            TagEnd::TableRow => self.out().push_str("</tr>"),
            TagEnd::Emphasis => self.inline_tag("</em>"),
            TagEnd::Strong => self.inline_tag("</strong>"),
            TagEnd::Strikethrough => self.inline_tag("</del>"),
            TagEnd::Superscript => self.inline_tag("</sup>"),
            TagEnd::Subscript => self.inline_tag("</sub>"),
            TagEnd::Image => {
                if let Some((src, title, alt)) = self.image.end() {
                    let html = self.hooks.image(&src, &alt, &title)?;
                    self.out().push_str(&html);
                }
            }
        }
        Ok(())
    }

    fn close_frame(&mut self, source: &str) -> Result<(), H::Error> {
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        let html = match frame.block {
            Block::Paragraph => self.hooks.paragraph(&frame.html)?,
            Block::Heading(level) => self.hooks.heading(level, frame.html.trim())?,
            Block::BlockQuote(range) => {
                let raw = source.get(range).map(strip_quote_markers).unwrap_or_default();
                let leading = self.frames.is_empty() && self.output.trim().is_empty();
                self.hooks.blockquote(BlockQuote {
                    html: &frame.html,
                    source: &raw,
                    leading,
                })?
            }
            Block::Item => self.hooks.list_item(&frame.html)?,
            Block::Cell => {
                let cell = TableCell {
                    header: self.table.is_in_head(),
                    align: self.table.current_alignment(),
                };
                self.table.next_cell();
                self.hooks.table_cell(&frame.html, cell)?
            }
            Block::Link { href, title } => self.hooks.link(&href, &title, &frame.html)?,
            Block::Html => self.hooks.html_block(&frame.html)?,
        };
        self.out().push_str(&html);
        Ok(())
    }

    fn inline_tag(&mut self, tag: &str) {
        if !self.image.is_active() {
            self.out().push_str(tag);
        }
    }

    fn text(&mut self, text: &str) {
        if self.code.is_active() {
            self.code.push_str(text);
        } else if self.image.is_active() {
            self.image.push_str(text);
        } else {
            let escaped = escape_html(text);
            self.out().push_str(&escaped);
        }
    }

    fn inline_code(&mut self, code: &str) -> Result<(), H::Error> {
        if self.image.is_active() {
            self.image.push_str(code);
        } else {
            let html = self.hooks.code_span(code)?;
            self.out().push_str(&html);
        }
        Ok(())
    }
}

/// Remove one level of `>` markers (and one following space) from a quote.
fn strip_quote_markers(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix('>') {
                Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
                None => line,
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use pretty_assertions::assert_eq;

    use super::*;

    /// Hooks using every default.
    struct Defaults;

    impl RenderHooks for Defaults {
        type Error = Infallible;
    }

    /// Hooks recording block quotes.
    #[derive(Default)]
    struct Quotes {
        seen: Vec<(String, bool)>,
    }

    impl RenderHooks for Quotes {
        type Error = Infallible;

        fn blockquote(&mut self, quote: BlockQuote<'_>) -> Result<String, Infallible> {
            self.seen.push((quote.source.to_owned(), quote.leading));
            Ok(String::new())
        }
    }

    /// Hooks bracketing raw HTML blocks.
    struct HtmlBlocks;

    impl RenderHooks for HtmlBlocks {
        type Error = Infallible;

        fn html_block(&mut self, html: &str) -> Result<String, Infallible> {
            Ok(format!("[{html}]"))
        }
    }

    fn render(markdown: &str) -> String {
        MarkdownRenderer::new(&mut Defaults).render(markdown).unwrap()
    }

    #[test]
    fn test_basic_blocks() {
        assert_eq!(render("Hello, *world*!"), "<p>Hello, <em>world</em>!</p>");
        assert_eq!(render("## Title"), "<h2>Title</h2>");
        assert_eq!(render("- a\n- b"), "<ul><li>a</li><li>b</li></ul>");
        assert_eq!(render("3. x"), r#"<ol start="3"><li>x</li></ol>"#);
        assert_eq!(render("a\n\n---\n\nb"), "<p>a</p><hr><p>b</p>");
    }

    #[test]
    fn test_escaping_and_raw_html() {
        assert_eq!(render("a < b & c"), "<p>a &lt; b &amp; c</p>");
        assert_eq!(
            render("<x-blank>a</x-blank> text"),
            "<p><x-blank>a</x-blank> text</p>"
        );
    }

    #[test]
    fn test_html_block_passed_whole_to_hook() {
        let html = MarkdownRenderer::new(&mut HtmlBlocks)
            .render("<div>\na [[b]]\n</div>\n\nText")
            .unwrap();
        assert_eq!(html, "[<div>\na [[b]]\n</div>\n]<p>Text</p>");
    }

    #[test]
    fn test_table() {
        let html = render("| a | b |\n|:-:|---|\n| 1 | 2 |");
        assert_eq!(
            html,
            r#"<table><thead><tr><th align="center">a</th><th>b</th></tr></thead><tbody><tr><td align="center">1</td><td>2</td></tr></tbody></table>"#
        );
    }

    #[test]
    fn test_links_images_and_code() {
        assert_eq!(
            render(r#"[x](http://a.com "T") ![i *b*](p.png) `<c>`"#),
            r#"<p><a href="http://a.com" title="T">x</a> <img src="p.png" alt="i b"> <code>&lt;c&gt;</code></p>"#
        );
    }

    #[test]
    fn test_code_blocks() {
        assert_eq!(
            render("```py extra\nx = 1\n```"),
            "<pre><code class=\"language-py\">x = 1\n</code></pre>"
        );
        assert_eq!(render("    a < b"), "<pre><code>a &lt; b\n</code></pre>");
    }

    #[test]
    fn test_blockquote_source_and_position() {
        let mut hooks = Quotes::default();
        let html = MarkdownRenderer::new(&mut hooks)
            .render("> id: intro\n> goals: a b\n\nText\n\n> class: wide")
            .unwrap();
        assert_eq!(html, "<p>Text</p>");
        assert_eq!(
            hooks.seen,
            vec![
                ("id: intro\ngoals: a b".to_owned(), true),
                ("class: wide".to_owned(), false),
            ]
        );
    }

    #[test]
    fn test_strip_quote_markers() {
        assert_eq!(strip_quote_markers("> a\n>b\n  > c\nlazy"), "a\nb\nc\nlazy");
    }
}
