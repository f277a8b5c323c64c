//! Compiler for interactive textbook Markdown.
//!
//! A chapter is written in Markdown extended with blanks (`[[a|b]]`),
//! variables (`${x}{x|1,10}`), equations (`$x^2$`), emoji shortcodes,
//! attribute shorthands (`{.class}`), `:::` block directives and indented
//! template blocks. [`Compiler::compile`] turns it into a [`Document`]: the
//! chapter split into steps at horizontal rules and into sections at level-1
//! headings, with goal ids and reading durations, plus the HTML of every
//! step and section.
//!
//! # Pipeline
//!
//! 1. Source rewriting: asset paths, `data-` attributes, header-less tables
//! 2. Block directives are expanded by the [`DirectivePreprocessor`]
//! 3. Markdown is rendered by the [`MarkdownRenderer`] with textbook
//!    [`RenderHooks`]; inline syntax becomes custom elements and equations
//!    become placeholders
//! 4. The markup is parsed into a [`TreeNode`] tree for attribute injection,
//!    nested Markdown, parent classes and table cleanup
//! 5. The tree is segmented into steps and sections
//! 6. Equation placeholders are resolved by a [`tb_math::EquationRenderer`]
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use tb_math::DelimitedTexRenderer;
//! use tb_renderer::Compiler;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let source = "# Light\n\nLight is [[fast]].\n\n---\n\n$E = mc^2$";
//! let output = Compiler::new(DelimitedTexRenderer)
//!     .compile("light", source, Path::new("."))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(output.document.sections[0].id, "light");
//! assert_eq!(output.document.sections[0].step_ids, vec!["step-0", "step-1"]);
//! assert_eq!(output.document.total_goals, 1);
//! # });
//! ```

mod attributes;
mod compiler;
mod context;
mod directive;
mod document;
mod dom;
mod error;
mod extensions;
mod goals;
mod hooks;
mod inline;
mod metadata;
mod options;
mod plain_text;
mod postprocess;
mod renderer;
mod segment;
mod source;
mod state;
mod template;
mod util;

pub use compiler::Compiler;
pub use directive::DirectivePreprocessor;
pub use document::{
    CompileOutput, CrossReferences, Document, FragmentOutput, Section, Step, Warning,
};
pub use dom::{TreeNode, inner_html, outer_html, parse_fragment, to_html};
pub use error::{CompileError, IdKind};
pub use hooks::{BlockQuote, CodeBlock, RenderHooks, TableCell};
pub use metadata::{Metadata, MetadataError, parse_metadata};
pub use options::{CompileOptions, DurationSettings};
pub use plain_text::plain_text;
pub use renderer::MarkdownRenderer;
pub use template::{ReadFileFn, TagTemplates, TemplateEngine, TemplateError};
pub use util::{escape_html, section_slug};
