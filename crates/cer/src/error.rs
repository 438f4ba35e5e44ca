//! CLI error types.

use cer_config::ConfigError;
use cer_export::{ExportError, GenerationError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Export(#[from] ExportError),

    #[error("{0}")]
    Generation(#[from] GenerationError),

    #[error("{0}")]
    Validation(String),
}
