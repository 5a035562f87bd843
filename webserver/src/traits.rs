//! Service trait definitions for dependency injection
//!
//! All I/O operations are abstracted through these traits for testability

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use uuid::Uuid;

use shared::{AuthUser, Category, Credentials, NewPrompt, PublishedPrompt, Session, SignUpOutcome};

use crate::error::WebServerResult;
use crate::types::CompletionSpec;

/// Ordered text fragments of one streamed completion.
///
/// The stream ends (`None`) only after the provider signalled a clean
/// completion; any other termination surfaces as an `Err` item.
pub type TextStream = BoxStream<'static, WebServerResult<String>>;

/// Chat-completion provider
#[mockall::automock]
#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    /// Issue one streaming completion request
    async fn stream_chat(&self, spec: CompletionSpec) -> WebServerResult<TextStream>;
}

/// Image-generation provider
#[mockall::automock]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image and return the provider's URL for it
    async fn generate(&self, prompt: &str) -> WebServerResult<String>;

    /// Fetch the bytes behind a provider URL
    async fn download(&self, url: &str) -> WebServerResult<Vec<u8>>;
}

/// Hosted backend: auth, prompt tables and object storage
#[mockall::automock]
#[async_trait]
pub trait BackendService: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> WebServerResult<SignUpOutcome>;

    async fn sign_in(&self, credentials: &Credentials) -> WebServerResult<Session>;

    /// Resolve a bearer token to its user
    async fn get_user(&self, access_token: &str) -> WebServerResult<AuthUser>;

    /// Public prompts, newest first
    async fn list_public_prompts(&self, category: Option<Category>, limit: u32) -> WebServerResult<Vec<PublishedPrompt>>;

    /// Prompts written by one author, newest first
    async fn list_author_prompts(&self, author_id: Uuid) -> WebServerResult<Vec<PublishedPrompt>>;

    /// Prompts a user liked, most recent like first
    async fn list_liked_prompts(&self, user_id: Uuid) -> WebServerResult<Vec<PublishedPrompt>>;

    async fn get_prompt(&self, id: i64) -> WebServerResult<Option<PublishedPrompt>>;

    async fn find_prompt_by_title(&self, title: &str, author_id: Uuid) -> WebServerResult<Option<PublishedPrompt>>;

    async fn insert_prompt(&self, prompt: &NewPrompt) -> WebServerResult<PublishedPrompt>;

    async fn update_likes(&self, prompt_id: i64, likes: i64) -> WebServerResult<()>;

    async fn has_like(&self, user_id: Uuid, prompt_id: i64) -> WebServerResult<bool>;

    async fn add_like(&self, user_id: Uuid, prompt_id: i64) -> WebServerResult<()>;

    async fn remove_like(&self, user_id: Uuid, prompt_id: i64) -> WebServerResult<()>;

    /// Store an object in the image bucket
    async fn upload_object(&self, path: &str, bytes: Vec<u8>, content_type: &str, upsert: bool) -> WebServerResult<()>;

    /// Public URL of an object in the image bucket
    fn public_url(&self, path: &str) -> String;
}
