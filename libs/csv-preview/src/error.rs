use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("CSV not found on disk: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse delimited text: {0}")]
    Csv(#[from] csv::Error),
}

impl PreviewError {
    /// Maps an I/O failure on `path`, keeping "not found" distinct.
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            PreviewError::NotFound(path.to_path_buf())
        } else {
            PreviewError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}
