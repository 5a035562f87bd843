//! Publishing prompts to the gallery
//!
//! The preview image is an explicit decision carried by the request rather
//! than an interactive confirmation. A failed preview never aborts the
//! publication.

use chrono::Utc;

use shared::{
    AuthUser, Category, Mode, NewPrompt, PreviewDecision, PreviewStatus, PublishOutcome, PublishRequest,
    PublishedPrompt, ServiceId, image_prompt, service_info, service_warn, summarize,
};

use crate::core::preview::generate_preview;
use crate::error::{WebServerError, WebServerResult};
use crate::traits::{BackendService, ImageGenerator};

pub const DESCRIPTION_CHARS: usize = 100;

/// Description column for a published result
pub fn describe(content: &str) -> String {
    format!("{}...", summarize(content, DESCRIPTION_CHARS))
}

fn require(field: &str, value: &str) -> WebServerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WebServerError::invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Publish an optimizer result
pub async fn publish<I, B>(images: &I, backend: &B, author: &AuthUser, request: PublishRequest) -> WebServerResult<PublishOutcome>
where
    I: ImageGenerator + ?Sized,
    B: BackendService + ?Sized,
{
    let title = require("title", &request.title)?;
    require("content", &request.content)?;
    let content = request.content;

    let preview = match (request.mode, request.preview) {
        (Mode::Image, PreviewDecision::Generate) => {
            match generate_preview(images, backend, &image_prompt(&content)).await {
                Ok(url) => PreviewStatus::Generated(url),
                Err(e) => {
                    service_warn!(ServiceId::current(), error = %e, "Preview generation failed, publishing without image");
                    PreviewStatus::Failed(e.to_string())
                }
            }
        }
        _ => PreviewStatus::NotRequested,
    };
    let image_url = match &preview {
        PreviewStatus::Generated(url) => Some(url.clone()),
        _ => None,
    };

    let new_prompt = NewPrompt {
        title,
        description: Some(describe(&content)),
        content,
        category: request.mode.category(),
        author_id: author.id,
        image_url,
        is_public: true,
        likes: 0,
    };
    let prompt = backend.insert_prompt(&new_prompt).await?;
    service_info!(ServiceId::current(), id = prompt.id, category = %new_prompt.category, "Prompt published");

    Ok(PublishOutcome { prompt, preview })
}

/// Image attached to a manual submission
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Lower-case extension of the original file name, `png` when absent
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "png".to_string())
    }
}

/// A hand-written prompt with its own picture
#[derive(Debug, Clone, PartialEq)]
pub struct ManualSubmission {
    pub title: String,
    pub content: String,
    pub category: Category,
    pub image: Option<ImageUpload>,
}

/// Pretty-print JSON content, keep anything else verbatim
pub fn normalize_content(content: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| content.to_string()),
        Err(_) => content.to_string(),
    }
}

/// Publish a manual submission; the image is required
pub async fn manual_publish<B>(backend: &B, author: &AuthUser, submission: ManualSubmission) -> WebServerResult<PublishedPrompt>
where
    B: BackendService + ?Sized,
{
    let title = require("title", &submission.title)?;
    require("content", &submission.content)?;
    let image = submission
        .image
        .filter(|image| !image.bytes.is_empty())
        .ok_or_else(|| WebServerError::invalid("image is required"))?;

    let path = format!("{}/{}.{}", author.id, Utc::now().timestamp_millis(), image.extension());
    backend
        .upload_object(&path, image.bytes, &image.content_type, false)
        .await?;

    let new_prompt = NewPrompt {
        title,
        content: normalize_content(&submission.content),
        description: None,
        category: submission.category,
        author_id: author.id,
        image_url: Some(backend.public_url(&path)),
        is_public: true,
        likes: 0,
    };
    let prompt = backend.insert_prompt(&new_prompt).await?;
    service_info!(ServiceId::current(), id = prompt.id, %path, "Manual prompt published");
    Ok(prompt)
}
