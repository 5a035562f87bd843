//! Shared types for the PromptHub services
//!
//! Contains the wire types exchanged between the browser/CLI and the webserver,
//! the structured-content interpreter and the incremental stream decoder used
//! by every consumer of the optimizer stream.

pub mod errors;
pub mod interpret;
pub mod logging;
pub mod messages;
pub mod stream;
pub mod types;

pub use errors::*;
pub use types::*;

pub use interpret::{Interpretation, PromptStructure, field_label, image_prompt, interpret};
pub use messages::{
    AuthUser, AuthorProfile, Credentials, ErrorBody, ImageRequest, ImageResponse, LikeOutcome,
    NewPrompt, OptimizationRequest, PreviewDecision, PreviewStatus, PublishOutcome,
    PublishRequest, PublishedPrompt, Session, SignUpOutcome,
};
pub use stream::{COMPLETION_MARKER, StreamOutcome, TranscriptBuilder, Utf8StreamDecoder};
