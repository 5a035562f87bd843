//! Type definitions for webserver
//!
//! Upstream wire formats (chat completions, image generation) and the query
//! types accepted by the gallery routes.

use serde::{Deserialize, Serialize};

/// One message of a chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self { format_type: "json_object".to_string() }
    }
}

/// Sampling parameters chosen per mode
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_output: bool,
}

/// Everything needed to issue one chat-completion request, minus the model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSpec {
    pub system: String,
    pub user: String,
    pub params: SamplingParams,
}

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatCompletionRequest {
    pub fn streaming(model: impl Into<String>, spec: &CompletionSpec) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::system(&spec.system), ChatMessage::user(&spec.user)],
            stream: true,
            temperature: spec.params.temperature,
            max_tokens: spec.params.max_tokens,
            response_format: spec.params.json_output.then(ResponseFormat::json_object),
        }
    }
}

/// One server-sent event payload of a streamed completion
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<UpstreamErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// In-band error object some providers emit mid-stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

impl UpstreamErrorBody {
    pub fn describe(&self) -> String {
        match (&self.message, &self.error_type) {
            (Some(message), _) => message.clone(),
            (None, Some(kind)) => kind.clone(),
            (None, None) => "unknown upstream error".to_string(),
        }
    }
}

/// Body of `POST /images/generations`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub image_size: String,
    pub size: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedImage {
    #[serde(default)]
    pub url: Option<String>,
}

/// Image providers disagree on the list name; both are accepted
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageGenerationResponse {
    #[serde(default)]
    pub data: Vec<GeneratedImage>,
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
}

impl ImageGenerationResponse {
    pub fn first_url(&self) -> Option<&str> {
        self.data
            .iter()
            .chain(self.images.iter())
            .find_map(|image| image.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// Query of `GET /api/prompts`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Which profile list to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileTab {
    #[default]
    Created,
    Liked,
}

/// Query of `GET /api/me/prompts`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub tab: ProfileTab,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub provider: String,
    pub image_generation: bool,
    pub uptime_seconds: u64,
    pub active_streams: u64,
    pub streams_started: u64,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_request_body() {
        let spec = CompletionSpec {
            system: "sys".to_string(),
            user: "hi".to_string(),
            params: SamplingParams { temperature: 0.9, max_tokens: 8192, json_output: true },
        };
        let body = serde_json::to_value(ChatCompletionRequest::streaming("m", &spec)).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["response_format"]["type"], "json_object");

        let plain = CompletionSpec {
            params: SamplingParams { json_output: false, ..spec.params.clone() },
            ..spec
        };
        let body = serde_json::to_value(ChatCompletionRequest::streaming("m", &plain)).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_image_response_accepts_either_list() {
        let data: ImageGenerationResponse = serde_json::from_str(r#"{"data":[{"url":"https://a/1.png"}]}"#).unwrap();
        assert_eq!(data.first_url(), Some("https://a/1.png"));

        let images: ImageGenerationResponse = serde_json::from_str(r#"{"images":[{"url":"https://b/2.png"}]}"#).unwrap();
        assert_eq!(images.first_url(), Some("https://b/2.png"));

        let empty: ImageGenerationResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert_eq!(empty.first_url(), None);
    }

    #[test]
    fn test_profile_tab_defaults_to_created() {
        let query: ProfileQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.tab, ProfileTab::Created);
        let query: ProfileQuery = serde_json::from_str(r#"{"tab":"liked"}"#).unwrap();
        assert_eq!(query.tab, ProfileTab::Liked);
    }
}
