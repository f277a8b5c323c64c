//! Textbook hooks for the Markdown renderer.
//!
//! In [`Mode::Document`] horizontal rules split steps and block quotes carry
//! metadata. [`Mode::Fragment`] renders both as plain HTML and is used for
//! snippets and nested `.md` content.

use crate::context::Session;
use crate::error::CompileError;
use crate::hooks::{BlockQuote, CodeBlock, RenderHooks, TableCell};
use crate::inline::{InlinePipeline, protect_code};
use crate::metadata::{Metadata, parse_metadata};
use crate::source::rewrite_image_src;
use crate::util::escape_html;

/// Language class names for code tags.
const CODE_LANGUAGES: &[(&str, &str)] = &[
    ("py", "language-python"),
    ("js", "language-js"),
    ("c", "language-clike"),
    ("jl", "language-julia"),
    ("r", "language-r"),
    ("code", "language-markup"),
    ("sh", "language-bash"),
];

/// Fence tag of display equations.
const LATEX: &str = "latex";

/// What structural constructs mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Rules split steps, quotes are metadata.
    Document,
    /// Everything renders as plain markup.
    Fragment,
}

/// Hooks implementing the textbook dialect for one compile.
pub(crate) struct TextbookHooks<'s, 'a> {
    session: &'s mut Session<'a>,
    mode: Mode,
    document_meta: Metadata,
    step_metas: Vec<Metadata>,
}

impl<'s, 'a> TextbookHooks<'s, 'a> {
    pub(crate) fn new(session: &'s mut Session<'a>, mode: Mode) -> Self {
        Self {
            session,
            mode,
            document_meta: Metadata::default(),
            step_metas: vec![Metadata::default()],
        }
    }

    /// Document metadata and one metadata entry per step.
    pub(crate) fn into_metadata(self) -> (Metadata, Vec<Metadata>) {
        (self.document_meta, self.step_metas)
    }

    fn inline(&mut self, html: &str) -> String {
        InlinePipeline::new(
            &mut self.session.equations,
            &self.session.options.emoji_path,
        )
        .process(html)
    }

    fn template_block(&mut self, code: &str) -> Result<String, CompileError> {
        let source = format!("{}{code}", self.session.prelude);
        let html = self
            .session
            .templates
            .render(&source, self.session.base_dir)?;
        let mixins = mixin_definitions(code);
        if !mixins.is_empty() {
            self.session.prelude.push_str(&mixins);
        }
        Ok(html)
    }
}

impl RenderHooks for TextbookHooks<'_, '_> {
    type Error = CompileError;

    fn paragraph(&mut self, html: &str) -> Result<String, CompileError> {
        Ok(format!("<p>{}</p>", self.inline(html)))
    }

    fn html_block(&mut self, html: &str) -> Result<String, CompileError> {
        Ok(self.inline(html))
    }

    fn blockquote(&mut self, quote: BlockQuote<'_>) -> Result<String, CompileError> {
        if self.mode == Mode::Fragment {
            return Ok(format!("<blockquote>{}</blockquote>", quote.html));
        }

        match parse_metadata(quote.source) {
            Ok(meta) if quote.leading => {
                let (document, step) = meta.split_document();
                self.document_meta.merge(document);
                if let Some(first) = self.step_metas.first_mut() {
                    first.merge(step);
                }
            }
            Ok(meta) => {
                if let Some(step) = self.step_metas.last_mut() {
                    step.merge(meta);
                }
            }
            Err(e) => self.session.warn(e.to_string(), Some(quote.source)),
        }
        Ok(String::new())
    }

    fn rule(&mut self) -> Result<String, CompileError> {
        if self.mode == Mode::Fragment {
            return Ok("<hr>".to_owned());
        }
        self.step_metas.push(Metadata::default());
        Ok("</x-step><x-step>".to_owned())
    }

    fn list_item(&mut self, html: &str) -> Result<String, CompileError> {
        Ok(format!("<li>{}</li>", self.inline(html)))
    }

    fn table_cell(&mut self, html: &str, cell: TableCell) -> Result<String, CompileError> {
        let tag = if cell.header { "th" } else { "td" };
        let html = self.inline(html);
        Ok(match cell.align {
            Some(align) => format!(r#"<{tag} align="{align}">{html}</{tag}>"#),
            None => format!("<{tag}>{html}</{tag}>"),
        })
    }

    fn link(&mut self, href: &str, _title: &str, html: &str) -> Result<String, CompileError> {
        if href == "btn:next" {
            return Ok(format!(r#"<button class="next-step">{html}</button>"#));
        }
        if href == "pill" {
            return Ok(format!(r#"<strong class="pill">{html}</strong>"#));
        }
        if let Some(id) = href.strip_prefix("gloss:") {
            self.session.references.glossary.insert(id.to_owned());
            let id = escape_html(id);
            return Ok(format!(r#"<x-gloss xid="{id}">{html}</x-gloss>"#));
        }
        if let Some(id) = href.strip_prefix("bio:") {
            self.session.references.bios.insert(id.to_owned());
            let id = escape_html(id);
            return Ok(format!(r#"<x-bio xid="{id}">{html}</x-bio>"#));
        }
        if let Some(id) = href.strip_prefix("target:") {
            let id = escape_html(id);
            return Ok(format!(
                r#"<span class="step-target" data-to="{id}">{html}</span>"#
            ));
        }
        if let Some(id) = href.strip_prefix("pill:") {
            let id = escape_html(id);
            return Ok(format!(
                r#"<strong class="pill step-target" data-to="{id}">{html}</strong>"#
            ));
        }
        if let Some(target) = href.strip_prefix("->") {
            let to = escape_html(&target.replace('_', " "));
            return Ok(format!(r#"<x-target to="{to}">{html}</x-target>"#));
        }
        Ok(format!(
            r#"<a href="{}" target="_blank">{html}</a>"#,
            escape_html(href)
        ))
    }

    fn image(&mut self, src: &str, alt: &str, title: &str) -> Result<String, CompileError> {
        let src = rewrite_image_src(
            src,
            self.session.document_id,
            &self.session.options.resource_prefix,
        )
        .unwrap_or_else(|| src.to_owned());
        let title = if title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, escape_html(title))
        };
        Ok(format!(
            r#"<img src="{}" alt="{}"{title}>"#,
            escape_html(&src),
            escape_html(alt)
        ))
    }

    fn code_span(&mut self, code: &str) -> Result<String, CompileError> {
        let code = restore_dollars(code);
        for (tag, class) in CODE_LANGUAGES {
            if let Some(rest) = code
                .strip_prefix('{')
                .and_then(|c| c.strip_prefix(*tag))
                .and_then(|c| c.strip_prefix('}'))
            {
                let body = protect_code(&escape_html(rest.trim()));
                return Ok(format!(r#"<code class="{class}">{body}</code>"#));
            }
        }
        Ok(format!("<code>{}</code>", protect_code(&escape_html(&code))))
    }

    fn code_block(&mut self, block: CodeBlock<'_>) -> Result<String, CompileError> {
        if block.indented {
            return self.template_block(block.code);
        }

        let code = restore_dollars(block.code);
        match block.language {
            Some(LATEX) => {
                let tex = format!(r"\begin{{align*}}{code}\end{{align*}}");
                let token = self.session.equations.placeholder(&tex, false);
                Ok(format!(r#"<p class="text-center">{token}</p>"#))
            }
            Some(tag) => {
                let class = CODE_LANGUAGES
                    .iter()
                    .find(|(short, _)| *short == tag)
                    .map_or_else(|| format!("language-{tag}"), |(_, class)| (*class).to_owned());
                Ok(format!(
                    r#"<pre class="{}"><code>{}</code></pre>"#,
                    escape_html(&class),
                    protect_code(&escape_html(&code))
                ))
            }
            None => Ok(format!(
                "<pre><code>{}</code></pre>",
                protect_code(&escape_html(&code))
            )),
        }
    }
}

/// Undo the doubling of `\$` applied to the source.
fn restore_dollars(code: &str) -> String {
    code.replace(r"\\$", r"\$")
}

/// Top-level `mixin` definitions of a template block, with their bodies.
fn mixin_definitions(code: &str) -> String {
    let mut out = String::new();
    let mut inside = false;
    for line in code.lines() {
        let top_level = !line.is_empty() && !line.starts_with([' ', '\t']);
        if top_level {
            inside = line.starts_with("mixin ");
        }
        if inside {
            out.push_str(line);
            out.push('\n');
        }
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::options::CompileOptions;
    use crate::renderer::MarkdownRenderer;
    use crate::template::TagTemplates;

    fn render_with(session: &mut Session<'_>, mode: Mode, markdown: &str) -> String {
        let mut hooks = TextbookHooks::new(session, mode);
        MarkdownRenderer::new(&mut hooks).render(markdown).unwrap()
    }

    fn render(markdown: &str) -> String {
        let options = CompileOptions::default();
        let templates = TagTemplates::new();
        let mut session = Session::new("doc", Path::new("."), &options, &templates);
        render_with(&mut session, Mode::Fragment, markdown)
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render("[Next](btn:next) [a](target:x) [b](pill:y) [c](pill) [d](->the_end)"),
            concat!(
                r#"<p><button class="next-step">Next</button> "#,
                r#"<span class="step-target" data-to="x">a</span> "#,
                r#"<strong class="pill step-target" data-to="y">b</strong> "#,
                r#"<strong class="pill">c</strong> "#,
                r#"<x-target to="the end">d</x-target></p>"#
            )
        );
        assert_eq!(
            render("[site](https://example.com)"),
            r#"<p><a href="https://example.com" target="_blank">site</a></p>"#
        );
    }

    #[test]
    fn test_cross_references_collected_once() {
        let options = CompileOptions::default();
        let templates = TagTemplates::new();
        let mut session = Session::new("doc", Path::new("."), &options, &templates);
        let html = render_with(
            &mut session,
            Mode::Document,
            "[light](gloss:photon), [again](gloss:photon), [Euler](bio:euler)",
        );
        assert_eq!(
            html,
            r#"<p><x-gloss xid="photon">light</x-gloss>, <x-gloss xid="photon">again</x-gloss>, <x-bio xid="euler">Euler</x-bio></p>"#
        );
        assert_eq!(session.references.glossary.len(), 1);
        assert!(session.references.bios.contains("euler"));
    }

    #[test]
    fn test_images_are_rewritten() {
        assert_eq!(
            render("![Circle](images/circle.png)"),
            r#"<p><img src="/resources/doc/images/circle.png" alt="Circle"></p>"#
        );
    }

    #[test]
    fn test_code_spans() {
        assert_eq!(
            render("`{py} x = [1]` and `$a$`"),
            r#"<p><code class="language-python">x = &#91;1]</code> and <code>&#36;a&#36;</code></p>"#
        );
    }

    #[test]
    fn test_fenced_code() {
        assert_eq!(
            render("```py\nprint('a:b')\n```"),
            "<pre class=\"language-python\"><code>print(&#x27;a&#58;b&#x27;)\n</code></pre>"
        );
        assert_eq!(
            render("```rust\nlet x;\n```"),
            "<pre class=\"language-rust\"><code>let x;\n</code></pre>"
        );
        assert_eq!(render("```\nplain\n```"), "<pre><code>plain\n</code></pre>");
    }

    #[test]
    fn test_latex_block() {
        let options = CompileOptions::default();
        let templates = TagTemplates::new();
        let mut session = Session::new("doc", Path::new("."), &options, &templates);
        let html = render_with(&mut session, Mode::Fragment, "```latex\nx = 1\n```");
        assert_eq!(html, r#"<p class="text-center">XEQUATIONX0XEQUATIONX</p>"#);
        let equation = session.equations.get("XEQUATIONX0XEQUATIONX").unwrap();
        assert_eq!(equation.source, "\\begin{align*}x = 1\n\\end{align*}");
        assert!(!equation.inline);
    }

    #[test]
    fn test_template_blocks_share_mixins() {
        let options = CompileOptions::default();
        let templates = TagTemplates::new();
        let mut session = Session::new("doc", Path::new("."), &options, &templates);
        let html = render_with(
            &mut session,
            Mode::Document,
            "    mixin box(n)\n      .box= n\n    +box('a')\n\nText\n\n    +box('b')\n",
        );
        assert_eq!(
            html,
            r#"<div class="box">a</div><p>Text</p><div class="box">b</div>"#
        );
        assert_eq!(session.prelude, "mixin box(n)\n  .box= n\n\n");
    }

    #[test]
    fn test_template_error_is_fatal() {
        let options = CompileOptions::default();
        let templates = TagTemplates::new();
        let mut session = Session::new("doc", Path::new("."), &options, &templates);
        let mut hooks = TextbookHooks::new(&mut session, Mode::Document);
        let result = MarkdownRenderer::new(&mut hooks).render("    +missing\n");
        assert!(matches!(result, Err(CompileError::Template(_))));
    }

    #[test]
    fn test_rules_and_metadata() {
        let options = CompileOptions::default();
        let templates = TagTemplates::new();
        let mut session = Session::new("doc", Path::new("."), &options, &templates);
        let mut hooks = TextbookHooks::new(&mut session, Mode::Document);
        let html = MarkdownRenderer::new(&mut hooks)
            .render("> title: Book\n\nA\n\n> id: first\n\n---\n\nB\n\n> class: wide\n\n> oops")
            .unwrap();
        assert_eq!(html, "<p>A</p></x-step><x-step><p>B</p>");

        let (document, steps) = hooks.into_metadata();
        assert_eq!(document.title.as_deref(), Some("Book"));
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].id.as_deref(), Some("first"));
        assert_eq!(steps[1].class.as_deref(), Some("wide"));
        assert_eq!(session.warnings.len(), 1);
        assert_eq!(session.warnings[0].snippet.as_deref(), Some("oops"));
    }

    #[test]
    fn test_fragment_mode_keeps_structure() {
        assert_eq!(render("> quoted\n\n---"), "<blockquote><p>quoted</p></blockquote><hr>");
    }

    #[test]
    fn test_mixin_definitions() {
        assert_eq!(
            mixin_definitions("p hi\nmixin a\n  b\n\n  c\ndiv\nmixin d\n"),
            "mixin a\n  b\n\n  c\nmixin d\n\n"
        );
        assert_eq!(mixin_definitions("p no mixins"), "");
    }
}
