//! Pipeline error surface. Every failure is fatal to the run: the first
//! error aborts the pipeline and is reported together with the failing
//! stage. No retries.

use std::path::{Path, PathBuf};

/// Errors surfaced by the batch-GCD pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed input at {}:{}: {}", .path.display(), .line, .reason)]
    InputFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("storage error on {}: {}", .path.display(), .source)]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

impl Error {
    /// A storage error tagged with the file or directory it concerns.
    pub fn storage(path: &Path, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn input(path: &Path, line: usize, reason: impl Into<String>) -> Self {
        Error::InputFormat {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }
}
