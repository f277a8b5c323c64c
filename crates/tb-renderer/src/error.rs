//! Error types for document compilation.

use std::fmt;

use crate::template::TemplateError;

/// Which kind of identifier an id error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// A step id.
    Step,
    /// A section id.
    Section,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Step => "step",
            Self::Section => "section",
        })
    }
}

/// Fatal error that aborts compiling one document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// An id contains the reserved `.` separator.
    #[error("invalid {kind} id `{id}`: ids must not contain `.`")]
    InvalidId {
        /// Step or section.
        kind: IdKind,
        /// The offending id.
        id: String,
    },

    /// Two steps or two sections share an id.
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId {
        /// Step or section.
        kind: IdKind,
        /// The repeated id.
        id: String,
    },

    /// A `:::` block directive body is not valid tag syntax.
    #[error("line {line}: block directive `{body}` failed to render")]
    Directive {
        /// 1-indexed source line.
        line: usize,
        /// Directive body after the marker.
        body: String,
        /// Templating failure.
        #[source]
        source: TemplateError,
    },

    /// An indented templating block failed to render.
    #[error("template block failed to render")]
    Template(#[from] TemplateError),
}
