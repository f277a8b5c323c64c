//! CLI error types.

use std::path::PathBuf;

use tb_config::ConfigError;
use tb_renderer::CompileError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{}: {source}", path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: CompileError,
    },

    #[error("chapter task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Validation(String),
}
