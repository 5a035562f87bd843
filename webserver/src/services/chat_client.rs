//! Chat-completion client for OpenAI-compatible providers

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use shared::{ServiceId, service_debug};

use crate::config::{ChatProvider, Timeouts};
use crate::error::{WebServerError, WebServerResult};
use crate::services::sse::completion_stream;
use crate::traits::{ChatCompletionClient, TextStream};
use crate::types::{ChatCompletionRequest, CompletionSpec};

/// Real chat client speaking the `/chat/completions` streaming protocol
#[derive(Debug, Clone)]
pub struct RealChatClient {
    http: reqwest::Client,
    provider: ChatProvider,
}

impl RealChatClient {
    pub fn new(provider: ChatProvider, timeouts: &Timeouts) -> WebServerResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .build()?;
        Ok(Self { http, provider })
    }

    pub fn provider(&self) -> &ChatProvider {
        &self.provider
    }
}

#[async_trait]
impl ChatCompletionClient for RealChatClient {
    async fn stream_chat(&self, spec: CompletionSpec) -> WebServerResult<TextStream> {
        let body = ChatCompletionRequest::streaming(self.provider.model(), &spec);
        service_debug!(
            ServiceId::current(),
            provider = self.provider.name(),
            model = %body.model,
            temperature = body.temperature,
            "Requesting streamed completion"
        );

        let response = self
            .http
            .post(self.provider.completions_url())
            .header(AUTHORIZATION, format!("Bearer {}", self.provider.api_key()))
            .header(ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| WebServerError::upstream(format!("{} request failed: {e}", self.provider.name())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebServerError::UpstreamStatus { status: status.as_u16(), body });
        }

        Ok(completion_stream(Box::pin(response.bytes_stream())))
    }
}
