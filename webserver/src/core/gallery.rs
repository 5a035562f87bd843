//! Gallery and profile listings

use shared::{AuthUser, Category, PublishedPrompt};

use crate::error::WebServerResult;
use crate::traits::BackendService;
use crate::types::{GalleryQuery, ProfileTab};

pub const MAX_GALLERY_LIMIT: u32 = 50;

/// Requested page size, clamped to `1..=50`; absent means the maximum
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(MAX_GALLERY_LIMIT).clamp(1, MAX_GALLERY_LIMIT)
}

/// Public prompts, newest first, optionally restricted to a category
pub async fn list_gallery<B>(backend: &B, query: &GalleryQuery) -> WebServerResult<Vec<PublishedPrompt>>
where
    B: BackendService + ?Sized,
{
    let category = Category::parse_filter(query.category.as_deref())?;
    backend.list_public_prompts(category, clamp_limit(query.limit)).await
}

/// The user's own or liked prompts
pub async fn list_profile<B>(backend: &B, user: &AuthUser, tab: ProfileTab) -> WebServerResult<Vec<PublishedPrompt>>
where
    B: BackendService + ?Sized,
{
    match tab {
        ProfileTab::Created => backend.list_author_prompts(user.id).await,
        ProfileTab::Liked => backend.list_liked_prompts(user.id).await,
    }
}
