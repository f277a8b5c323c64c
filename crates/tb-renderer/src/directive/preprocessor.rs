//! Line-oriented expansion of `:::` block directives into container markup.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::fence::FenceTracker;
use crate::error::CompileError;
use crate::template::{TemplateEngine, TemplateError};

static COLUMN_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"width="([0-9]+)""#).expect("invalid column width regex"));

/// Kind of an open block, used to tell siblings from nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Generic,
    /// Explicit `::: row`.
    Row,
    Column,
    /// Explicit `::: tabs`.
    Tabs,
    Tab,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// Markup emitted when the block closes.
    close: String,
    /// Where the block opened, for diagnostics.
    line: usize,
    body: String,
}

/// Parsed `:::` line.
#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    Close,
    Row(&'a str),
    Column(&'a str),
    Tabs(&'a str),
    Tab(&'a str),
    Generic(&'a str),
}

/// Preprocessor expanding block directives before Markdown parsing.
///
/// - `::: tag.class(attr=1)` → the start tag of the rendered template;
///   the matching `:::` emits its end tag
/// - `::: column(width=4)` opens a column; another `::: column` while a
///   column is open closes it and opens a sibling. Without an explicit
///   `::: row` the columns get an implicit `div.row.padded` wrapper that a
///   single `:::` closes together with the last column.
/// - `::: tab` works the same way with an `x-tabbox` wrapper (or an explicit
///   `::: tabs`).
///
/// Emitted tags are surrounded by blank lines so that Markdown between them
/// is parsed as blocks.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use tb_renderer::{DirectivePreprocessor, TagTemplates};
///
/// let templates = TagTemplates::new();
/// let mut preprocessor = DirectivePreprocessor::new(&templates, Path::new("."));
/// let output = preprocessor.process("::: .box\nHello\n:::").unwrap();
/// assert!(output.contains(r#"<div class="box">"#));
/// assert!(output.contains("</div>"));
/// assert!(preprocessor.warnings().is_empty());
/// ```
pub struct DirectivePreprocessor<'a> {
    templates: &'a dyn TemplateEngine,
    base_dir: &'a Path,
    frames: Vec<Frame>,
    fence: FenceTracker,
    warnings: Vec<String>,
}

impl<'a> DirectivePreprocessor<'a> {
    /// Create a preprocessor rendering directive bodies with `templates`.
    pub fn new(templates: &'a dyn TemplateEngine, base_dir: &'a Path) -> Self {
        Self {
            templates,
            base_dir,
            frames: Vec::new(),
            fence: FenceTracker::default(),
            warnings: Vec::new(),
        }
    }

    /// Expand every directive in `input`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Directive`] if a directive body is not valid
    /// tag syntax or does not render to an element with an end tag.
    pub fn process(&mut self, input: &str) -> Result<String, CompileError> {
        let mut output = String::with_capacity(input.len() + 256);

        for (index, line) in input.lines().enumerate() {
            let line_num = index + 1;
            self.fence.update(line);
            let directive = if self.fence.in_fence() {
                None
            } else {
                parse_directive(line)
            };
            match directive {
                Some(directive) => {
                    let expanded = self.expand(directive, line_num)?;
                    output.push_str(&expanded);
                }
                None => output.push_str(line),
            }
            output.push('\n');
        }

        while let Some(frame) = self.frames.pop() {
            self.warnings.push(format!(
                "line {}: unclosed block directive `{}`",
                frame.line, frame.body
            ));
            output.push('\n');
            output.push_str(&frame.close);
            output.push('\n');
        }

        Ok(output)
    }

    /// Warnings generated during processing.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Consume the preprocessor and return its warnings.
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    fn expand(&mut self, directive: Directive<'_>, line: usize) -> Result<String, CompileError> {
        match directive {
            Directive::Close => Ok(self.close(line)),
            Directive::Row(rest) => {
                let open = self.open_tag(&format!("div.row.padded{rest}"), line)?;
                self.push(FrameKind::Row, "</div>", line, &format!("row{rest}"));
                Ok(format!("\n{open}\n"))
            }
            Directive::Tabs(rest) => {
                let open = self.open_tag(&format!("x-tabbox{rest}"), line)?;
                self.push(FrameKind::Tabs, "</x-tabbox>", line, &format!("tabs{rest}"));
                Ok(format!("\n{open}\n"))
            }
            Directive::Column(rest) => {
                let open = self.open_tag(&format!("div{rest}"), line)?;
                let open = COLUMN_WIDTH.replace(&open, r#"style="width: ${1}px""#);
                Ok(self.open_member(
                    FrameKind::Column,
                    FrameKind::Row,
                    r#"<div class="row padded">"#,
                    "</div>",
                    &open,
                    line,
                    &format!("column{rest}"),
                ))
            }
            Directive::Tab(rest) => {
                let open = self.open_tag(&format!(".tab{rest}"), line)?;
                Ok(self.open_member(
                    FrameKind::Tab,
                    FrameKind::Tabs,
                    "<x-tabbox>",
                    "</x-tabbox>",
                    &open,
                    line,
                    &format!("tab{rest}"),
                ))
            }
            Directive::Generic(body) => {
                let rendered = self.render(body, line)?;
                let Some(split) = rendered.find("</") else {
                    return Err(CompileError::Directive {
                        line,
                        body: body.to_owned(),
                        source: TemplateError::syntax(1, "element has no end tag"),
                    });
                };
                let (open, close) = rendered.split_at(split);
                let open = open.to_owned();
                self.push(FrameKind::Generic, close, line, body);
                Ok(format!("\n{open}\n"))
            }
        }
    }

    /// Open a column or tab: a sibling of an open member, a child of an
    /// explicit group, or the first member of an implicit group.
    #[allow(clippy::too_many_arguments)]
    fn open_member(
        &mut self,
        kind: FrameKind,
        group: FrameKind,
        wrapper_open: &str,
        wrapper_close: &str,
        open: &str,
        line: usize,
        body: &str,
    ) -> String {
        match self.frames.last().map(|frame| frame.kind) {
            Some(top) if top == kind => format!("\n</div>\n\n{open}\n"),
            Some(top) if top == group => {
                self.push(kind, "</div>", line, body);
                format!("\n{open}\n")
            }
            _ => {
                self.push(kind, &format!("</div>\n{wrapper_close}"), line, body);
                format!("\n{wrapper_open}\n{open}\n")
            }
        }
    }

    fn close(&mut self, line: usize) -> String {
        match self.frames.pop() {
            Some(frame) => format!("\n{}\n", frame.close),
            None => {
                self.warnings
                    .push(format!("line {line}: stray ::: with no open block"));
                String::new()
            }
        }
    }

    fn push(&mut self, kind: FrameKind, close: &str, line: usize, body: &str) {
        self.frames.push(Frame {
            kind,
            close: close.to_owned(),
            line,
            body: body.to_owned(),
        });
    }

    fn render(&self, body: &str, line: usize) -> Result<String, CompileError> {
        self.templates
            .render(body, self.base_dir)
            .map_err(|source| CompileError::Directive {
                line,
                body: body.to_owned(),
                source,
            })
    }

    /// Render `body` and keep only its start tag.
    fn open_tag(&self, body: &str, line: usize) -> Result<String, CompileError> {
        let rendered = self.render(body, line)?;
        Ok(match rendered.find("</") {
            Some(split) => rendered[..split].to_owned(),
            None => rendered,
        })
    }
}

/// Parse a `:::` line. The marker must start the line.
fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let rest = line.strip_prefix(":::")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let body = rest.trim();
    if body.is_empty() {
        return Some(Directive::Close);
    }

    let keyword = |name: &str| {
        body.strip_prefix(name)
            .filter(|rest| rest.is_empty() || rest.starts_with(['.', '#', '(']))
    };
    Some(if let Some(rest) = keyword("row") {
        Directive::Row(rest)
    } else if let Some(rest) = keyword("column") {
        Directive::Column(rest)
    } else if let Some(rest) = keyword("tabs") {
        Directive::Tabs(rest)
    } else if let Some(rest) = keyword("tab") {
        Directive::Tab(rest)
    } else {
        Directive::Generic(body)
    })
}
