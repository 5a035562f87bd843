//! Shared error types for the PromptHub services

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Unknown mode: {input}")]
    InvalidMode { input: String },

    #[error("Unknown category: {input}")]
    InvalidCategory { input: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
