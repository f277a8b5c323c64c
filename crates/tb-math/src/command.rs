//! External-program equation renderer.

use std::io::ErrorKind;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::MathError;
use crate::renderer::EquationRenderer;

/// Renders equations by piping the expression to an external program.
///
/// The program reads TeX on stdin and writes markup (usually SVG) to stdout.
/// `inline_args` are appended for inline expressions, e.g. `--inline` for
/// `tex2svg`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    inline_args: Vec<String>,
}

impl CommandRenderer {
    /// Create a renderer for `program` with no extra arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            inline_args: Vec::new(),
        }
    }

    /// Arguments passed on every invocation.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Arguments appended for inline expressions.
    #[must_use]
    pub fn with_inline_args(mut self, args: Vec<String>) -> Self {
        self.inline_args = args;
        self
    }

    fn spawn_error(&self, source: std::io::Error) -> MathError {
        MathError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl EquationRenderer for CommandRenderer {
    async fn render(&self, source: &str, inline: bool) -> Result<String, MathError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if inline {
            command.args(&self.inline_args);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // A program that exits without reading stdin is judged by its status
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(source.as_bytes()).await
            && e.kind() != ErrorKind::BrokenPipe
        {
            return Err(self.spawn_error(e));
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(MathError::Command {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let markup = String::from_utf8(output.stdout)?;
        Ok(clean_svg(markup.trim()))
    }
}

/// Strip accessibility boilerplate that MathJax adds to standalone SVGs.
///
/// The title id is not unique once several equations share a page, so the
/// reference to it is replaced by a class.
#[must_use]
pub fn clean_svg(svg: &str) -> String {
    svg.replacen(r#"role="img" focusable="false" "#, "", 1)
        .replacen(r#" id="MathJax-SVG-1-Title""#, "", 1)
        .replacen(r#"aria-labelledby="MathJax-SVG-1-Title""#, r#"class="mathjax""#, 1)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_clean_svg() {
        let svg = r#"<svg role="img" focusable="false" aria-labelledby="MathJax-SVG-1-Title"><title id="MathJax-SVG-1-Title">x</title></svg>"#;
        assert_eq!(
            clean_svg(svg),
            r#"<svg class="mathjax"><title>x</title></svg>"#
        );
    }

    #[test]
    fn test_clean_svg_leaves_other_markup() {
        assert_eq!(clean_svg("<svg></svg>"), "<svg></svg>");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_renderer_pipes_stdin() {
        let renderer = CommandRenderer::new("cat");
        let markup = renderer.render("<svg>x</svg>", true).await.unwrap();
        assert_eq!(markup, "<svg>x</svg>");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_renderer_inline_args() {
        let renderer = CommandRenderer::new("echo")
            .with_args(vec!["display".to_owned()])
            .with_inline_args(vec!["inline".to_owned()]);
        assert_eq!(renderer.render("", true).await.unwrap(), "display inline");
        assert_eq!(renderer.render("", false).await.unwrap(), "display");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_renderer_failure() {
        let renderer = CommandRenderer::new("false");
        let err = renderer.render("x", true).await.unwrap_err();
        assert!(matches!(err, MathError::Command { .. }));
    }

    #[tokio::test]
    async fn test_command_renderer_missing_program() {
        let renderer = CommandRenderer::new("definitely-not-a-real-tex-renderer");
        let err = renderer.render("x", true).await.unwrap_err();
        assert!(matches!(err, MathError::Spawn { .. }));
    }
}
