//! Importer error types

use std::path::PathBuf;

use shared::SharedError;
use thiserror::Error;
use webserver::WebServerError;

#[derive(Error, Debug)]
pub enum ImporterError {
    #[error("Cannot read {}: {source}", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Image file not found: {}", path.display())]
    MissingImage { path: PathBuf },

    #[error("Backend error: {0}")]
    Backend(#[from] WebServerError),

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ImporterResult<T> = Result<T, ImporterError>;
