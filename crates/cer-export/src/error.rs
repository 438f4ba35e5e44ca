//! Export error types.

use std::io;
use std::path::PathBuf;

use cer_render::WordError;

use crate::print::PrintError;

/// Error that aborts an export.
///
/// Diagram and content problems never end up here; they degrade inside
/// the document and are listed in the export report instead.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// An output artifact could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The word-processor package could not be serialized.
    #[error("cannot write {}: {source}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: WordError,
    },

    /// The printing surface failed to produce the PDF.
    #[error("PDF printing failed: {0}")]
    Print(#[from] PrintError),

    /// The export was cancelled between two stages.
    #[error("export cancelled")]
    Cancelled,
}

impl ExportError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
