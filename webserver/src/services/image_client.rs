//! Image-generation client

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use shared::{ServiceId, service_debug, summarize};

use crate::config::{IMAGE_PROMPT_MAX_CHARS, ImageProviderConfig, Timeouts};
use crate::error::{WebServerError, WebServerResult};
use crate::traits::ImageGenerator;
use crate::types::{ImageGenerationRequest, ImageGenerationResponse};

/// Real image generator; without a provider every call reports
/// [`WebServerError::ImageUnavailable`]
#[derive(Debug, Clone)]
pub struct RealImageGenerator {
    http: reqwest::Client,
    config: Option<ImageProviderConfig>,
}

impl RealImageGenerator {
    pub fn new(config: Option<ImageProviderConfig>, timeouts: &Timeouts) -> WebServerResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.establish)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl ImageGenerator for RealImageGenerator {
    async fn generate(&self, prompt: &str) -> WebServerResult<String> {
        let config = self.config.as_ref().ok_or(WebServerError::ImageUnavailable)?;

        let body = ImageGenerationRequest {
            model: config.model.clone(),
            prompt: summarize(prompt, IMAGE_PROMPT_MAX_CHARS),
            n: 1,
            image_size: config.size.clone(),
            size: config.size.clone(),
        };
        service_debug!(ServiceId::current(), model = %body.model, chars = body.prompt.chars().count(), "Generating image");

        let response = self
            .http
            .post(config.generations_url())
            .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebServerError::UpstreamStatus { status: status.as_u16(), body });
        }

        let generated: ImageGenerationResponse = response.json().await?;
        generated
            .first_url()
            .map(str::to_string)
            .ok_or_else(|| WebServerError::upstream("image provider returned no image"))
    }

    async fn download(&self, url: &str) -> WebServerResult<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WebServerError::UpstreamStatus {
                status: status.as_u16(),
                body: format!("download of {url} failed"),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
