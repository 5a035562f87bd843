//! PromptHub client library
//!
//! Consumes the optimizer stream incrementally and talks to the gallery API.
//! The `prompthub` binary is a thin command line front end over it.

pub mod api;
pub mod consumer;
pub mod error;
pub mod render;

pub use api::PromptHubClient;
pub use consumer::{SnapshotStatus, StreamConsumer, StreamHandle, TranscriptSnapshot};
pub use error::{ClientError, ClientResult};
