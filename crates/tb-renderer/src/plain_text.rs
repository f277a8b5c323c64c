//! Lossy plain-text rendition of a document.
//!
//! Used for search indexes and word counts. Blanks are replaced by their
//! first answer, variables by their expression and links by their text.
//! Code, tables, images, metadata and directive lines are dropped.

use std::sync::LazyLock;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;

use crate::renderer::parser_options;

static BLANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]+)(\|[^\]]*)?]]").expect("invalid blank regex"));

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}(\{[^}]+\})?").expect("invalid variable regex")
});

static SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]+\}[ \t]*").expect("invalid shorthand regex"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").expect("invalid blank lines regex"));

/// Render `source` as plain text.
///
/// # Example
///
/// ```
/// let text = tb_renderer::plain_text("# Circles\n\nA [[circle|square]] has ${n}{n|3} [sides](gloss:side).");
/// assert_eq!(text, "Circles\n\nA circle has n sides.");
/// ```
pub fn plain_text(source: &str) -> String {
    let source = strip_lines(source);
    let source = BLANK.replace_all(&source, "${1}");

    let mut writer = TextWriter::default();
    for event in Parser::new_ext(&source, parser_options()) {
        writer.event(event);
    }

    let text = VARIABLE.replace_all(&writer.out, "${1}");
    let text = SHORTHAND.replace_all(&text, "");
    BLANK_LINES.replace_all(&text, "\n\n").trim().to_owned()
}

/// Drop comment, table, directive and standalone shorthand lines.
fn strip_lines(source: &str) -> String {
    source
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.starts_with("//")
                || trimmed.starts_with('|')
                || trimmed.starts_with(":::")
                || (trimmed.starts_with('{') && trimmed.ends_with('}')))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Default)]
struct TextWriter {
    out: String,
    /// Depth of constructs whose text is dropped.
    skip: usize,
}

impl TextWriter {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(&tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Code(text) if self.skip == 0 => self.out.push_str(&text),
            Event::SoftBreak | Event::HardBreak if self.skip == 0 => self.out.push('\n'),
            Event::Rule => self.out.push_str("\n\n"),
            _ => {}
        }
    }

    fn start(&mut self, tag: &Tag<'_>) {
        match tag {
            Tag::BlockQuote(_)
            | Tag::CodeBlock(_)
            | Tag::Image { .. }
            | Tag::Table(_)
            | Tag::HtmlBlock
            | Tag::MetadataBlock(_) => self.skip += 1,
            Tag::Heading { .. } => self.out.push_str("\n\n"),
            Tag::Item if self.skip == 0 => self.out.push_str("* "),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::BlockQuote(_)
            | TagEnd::CodeBlock
            | TagEnd::Image
            | TagEnd::Table
            | TagEnd::HtmlBlock
            | TagEnd::MetadataBlock(_) => self.skip = self.skip.saturating_sub(1),
            TagEnd::Heading(_) | TagEnd::Paragraph | TagEnd::List(_) if self.skip == 0 => {
                self.out.push_str("\n\n");
            }
            TagEnd::Item if self.skip == 0 => self.out.push('\n'),
            _ => {}
        }
    }
}
