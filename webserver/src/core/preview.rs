//! Preview image: generate, fetch, re-host

use chrono::Utc;

use shared::{ServiceId, service_info};

use crate::error::{WebServerError, WebServerResult};
use crate::traits::{BackendService, ImageGenerator};

/// Generate an image for `prompt`, copy it into the image bucket and return
/// its public URL. Single attempt, no retries.
pub async fn generate_preview<I, B>(images: &I, backend: &B, prompt: &str) -> WebServerResult<String>
where
    I: ImageGenerator + ?Sized,
    B: BackendService + ?Sized,
{
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(WebServerError::invalid("prompt is required"));
    }

    let provider_url = images.generate(prompt).await?;
    let bytes = images.download(&provider_url).await?;

    let path = format!("flux_{}.png", Utc::now().timestamp_millis());
    backend.upload_object(&path, bytes, "image/png", false).await?;

    let public_url = backend.public_url(&path);
    service_info!(ServiceId::current(), %public_url, "Preview image stored");
    Ok(public_url)
}
