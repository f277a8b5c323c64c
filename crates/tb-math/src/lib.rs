//! Equation placeholders and memoized notation rendering.
//!
//! Equations are not rendered while Markdown is being parsed. Instead the
//! parser asks an [`EquationTable`] for an opaque placeholder token and keeps
//! going. Once the markup for a document (or a nested fragment) is complete,
//! [`EquationTable::resolve`] scans it for tokens and substitutes the output
//! of an [`EquationRenderer`].
//!
//! # Renderers
//!
//! - [`CommandRenderer`]: pipes each expression to an external program
//! - [`DelimitedTexRenderer`]: emits delimited TeX for client-side typesetting
//! - [`CachedRenderer`]: memoizes any renderer through an [`EquationCache`]
//!
//! # Example
//!
//! ```
//! use tb_math::{DelimitedTexRenderer, EquationTable};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut table = EquationTable::new();
//! let token = table.placeholder("x+1", true);
//! let html = format!("<p>Bye {token}.</p>");
//!
//! let resolved = table.resolve(&html, &DelimitedTexRenderer).await;
//! assert_eq!(resolved.html, r#"<p>Bye <span class="math">\(x+1\)</span>.</p>"#);
//! assert!(table.is_empty());
//! # });
//! ```

mod cache;
mod command;
mod error;
mod key;
mod placeholder;
mod renderer;

pub use cache::{EquationCache, FileEquationCache, MemoryEquationCache, NullEquationCache};
pub use command::{CommandRenderer, clean_svg};
pub use error::MathError;
pub use key::EquationKey;
pub use placeholder::{Equation, EquationFailure, EquationTable, Resolved, contains_placeholder};
pub use renderer::{CachedRenderer, DelimitedTexRenderer, EquationRenderer};
