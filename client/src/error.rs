//! Client-specific error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Server answered HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid server URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Not logged in: pass --token or set PROMPTHUB_TOKEN")]
    MissingToken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stream task failed: {0}")]
    StreamTask(String),

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ClientError {
    /// True for errors the server reported as a bad credential
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Server { status: 401, .. } | Self::MissingToken)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
