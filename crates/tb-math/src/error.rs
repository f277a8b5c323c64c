//! Equation rendering errors.

use std::process::ExitStatus;

/// Error returned by an [`EquationRenderer`](crate::EquationRenderer).
#[derive(Debug, thiserror::Error)]
pub enum MathError {
    /// The renderer process could not be started or talked to.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The renderer process exited unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    Command {
        /// Program that was invoked.
        program: String,
        /// Exit status of the process.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },
    /// The renderer produced output that is not UTF-8.
    #[error("renderer output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// The renderer rejected the expression.
    #[error("{0}")]
    Invalid(String),
}
