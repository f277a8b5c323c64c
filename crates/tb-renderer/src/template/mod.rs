//! Indentation-based tag templating.
//!
//! A small tag language shared by block directives, `{...}` attribute
//! shorthands and indented code blocks:
//!
//! ```text
//! mixin card(title)
//!   .card
//!     h3= title
//!     block
//! x-slideshow.wide(data-delay=200)
//!   +card("One")
//!     p First slide
//! ```
//!
//! Supported: `tag#id.class(attr=value)` lines with trailing text, `tag: child`
//! expansion, `tag.` text blocks, `|` piped text, literal `<html>` lines,
//! `//` comments, mixins with `block`, `include`, and `#{var}` / `!{var}`
//! interpolation. Control flow and JavaScript expressions are rejected.

mod block;
mod tag;

use std::io;
use std::path::Path;

use block::BlockRenderer;

/// Function reading an included file.
pub type ReadFileFn = dyn Fn(&Path) -> io::Result<String> + Send + Sync;

/// Maximum depth of nested includes and mixin calls.
const MAX_DEPTH: usize = 32;

/// Error rendering a template.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// The source is not valid template syntax.
    #[error("line {line}: {message}")]
    Syntax {
        /// 1-indexed line within the rendered source.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// An attribute or interpolation names an unbound variable.
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    /// A `+name` call names a mixin that was never defined.
    #[error("unknown mixin `{0}`")]
    UnknownMixin(String),

    /// An included file could not be read.
    #[error("cannot include `{path}`: {message}")]
    Include {
        /// Path as resolved against the base directory.
        path: String,
        /// Underlying failure.
        message: String,
    },

    /// Includes or mixin calls nest too deeply.
    #[error("includes or mixin calls nest deeper than {MAX_DEPTH} levels")]
    Recursion,
}

impl TemplateError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Capability rendering tag-template source into HTML.
///
/// Implementations must be safe to share between concurrent compiles.
pub trait TemplateEngine: Send + Sync {
    /// Render `source` to HTML.
    ///
    /// `base_dir` resolves relative `include` paths.
    fn render(&self, source: &str, base_dir: &Path) -> Result<String, TemplateError>;
}

/// Built-in [`TemplateEngine`] for the tag language described above.
pub struct TagTemplates {
    read_file: Box<ReadFileFn>,
}

impl TagTemplates {
    /// Create an engine reading includes from the filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self {
            read_file: Box::new(|path| std::fs::read_to_string(path)),
        }
    }

    /// Use a custom function to read included files.
    #[must_use]
    pub fn with_read_file<F>(mut self, f: F) -> Self
    where
        F: Fn(&Path) -> io::Result<String> + Send + Sync + 'static,
    {
        self.read_file = Box::new(f);
        self
    }
}

impl Default for TagTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for TagTemplates {
    fn render(&self, source: &str, base_dir: &Path) -> Result<String, TemplateError> {
        BlockRenderer::new(base_dir, &*self.read_file).render_source(source)
    }
}
