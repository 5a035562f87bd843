//! Wire types exchanged with the webserver
//!
//! JSON field names follow what the browser and the hosted database already use
//! (`userInput`, `imageUrl`, snake_case table columns).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interpret::{Interpretation, interpret};
use crate::types::{Category, Mode};

/// Body of `POST /api/optimize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub mode: Mode,
}

impl OptimizationRequest {
    pub fn new(user_input: impl Into<String>, mode: Mode) -> Self {
        Self {
            user_input: user_input.into(),
            mode,
        }
    }
}

/// Body of `POST /api/generate-image`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
}

/// Answer of `POST /api/generate-image`; failures are reported in-band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImageResponse {
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            image_url: None,
            error: Some(error.into()),
        }
    }
}

/// JSON error payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Author profile embedded in prompt rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// A prompt record as stored in the `prompts` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPrompt {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "profiles", skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorProfile>,
}

impl PublishedPrompt {
    /// Category with legacy and missing values folded into chat
    pub fn category(&self) -> Category {
        Category::from_stored(self.category.as_deref())
    }

    /// Short text shown on a gallery card
    pub fn preview_text(&self) -> String {
        let fallback = || {
            self.description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| self.content.clone())
        };

        if self.category() != Category::Image {
            return fallback();
        }

        match interpret(&self.content) {
            Interpretation::Structured { english, chinese } => chinese
                .as_ref()
                .and_then(|s| s.get("主体"))
                .or_else(|| english.as_ref().and_then(|s| s.get("subject")))
                .map(str::to_string)
                .unwrap_or_else(|| "点击查看详情".to_string()),
            Interpretation::Opaque(_) => fallback(),
        }
    }
}

/// Insert payload for the `prompts` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrompt {
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub category: Category,
    pub author_id: Uuid,
    pub image_url: Option<String>,
    pub is_public: bool,
    pub likes: i64,
}

/// Whether a preview image should be generated before publishing.
/// Only honoured for image-mode results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewDecision {
    #[default]
    Skip,
    Generate,
}

/// Body of `POST /api/prompts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub preview: PreviewDecision,
}

/// What happened to the optional preview image during publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PreviewStatus {
    NotRequested,
    Generated(String),
    Failed(String),
}

/// Answer of a successful publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub prompt: PublishedPrompt,
    pub preview: PreviewStatus,
}

/// Answer of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: i64,
}

/// E-mail/password pair for sign-up and login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Authenticated user as reported by the auth backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session returned by login; `access_token` is sent back as a bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Answer of sign-up. `session` is absent while the address awaits
/// confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    #[serde(default)]
    pub session: Option<Session>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(category: Option<&str>, content: &str, description: Option<&str>) -> PublishedPrompt {
        PublishedPrompt {
            id: 1,
            title: "t".to_string(),
            content: content.to_string(),
            description: description.map(str::to_string),
            category: category.map(str::to_string),
            author_id: None,
            image_url: None,
            likes: 0,
            is_public: true,
            created_at: None,
            author: None,
        }
    }

    #[test]
    fn test_optimization_request_defaults_to_chat() {
        let request: OptimizationRequest = serde_json::from_str(r#"{"userInput":"hi"}"#).unwrap();
        assert_eq!(request.user_input, "hi");
        assert_eq!(request.mode, Mode::Chat);

        let missing: OptimizationRequest = serde_json::from_str(r#"{"mode":"code"}"#).unwrap();
        assert!(missing.user_input.is_empty());
    }

    #[test]
    fn test_image_response_wire_format() {
        let ok = serde_json::to_value(ImageResponse::success("https://x/y.png")).unwrap();
        assert_eq!(ok, serde_json::json!({"imageUrl": "https://x/y.png"}));

        let failed = serde_json::to_value(ImageResponse::failure("boom")).unwrap();
        assert_eq!(failed, serde_json::json!({"imageUrl": null, "error": "boom"}));
    }

    #[test]
    fn test_published_prompt_reads_supabase_row() {
        let row = serde_json::json!({
            "id": 7,
            "title": "Cat",
            "content": "text",
            "category": "绘画",
            "author_id": "4790e8c7-69c1-41e2-b24f-2b66e31d6249",
            "likes": 3,
            "is_public": true,
            "created_at": "2024-05-01T12:00:00.123456+00:00",
            "profiles": {"username": "neo", "avatar_url": null}
        });
        let parsed: PublishedPrompt = serde_json::from_value(row).unwrap();
        assert_eq!(parsed.category(), Category::Image);
        assert_eq!(parsed.author.unwrap().username.as_deref(), Some("neo"));
        assert!(parsed.created_at.is_some());
    }

    #[test]
    fn test_preview_text_prefers_chinese_subject() {
        let content = r#"{"english_structure":{"subject":"a cat"},"chinese_structure":{"主体":"一只猫"}}"#;
        assert_eq!(prompt(Some("绘画"), content, None).preview_text(), "一只猫");

        let english_only = r#"{"english_structure":{"subject":"a cat"}}"#;
        assert_eq!(prompt(Some("绘画"), english_only, None).preview_text(), "a cat");

        let no_subject = r#"{"english_structure":{"art_direction":"anime"}}"#;
        assert_eq!(prompt(Some("绘画"), no_subject, None).preview_text(), "点击查看详情");
    }

    #[test]
    fn test_preview_text_falls_back_to_description() {
        assert_eq!(prompt(Some("绘画"), "plain", Some("desc")).preview_text(), "desc");
        assert_eq!(prompt(Some("绘画"), "plain", None).preview_text(), "plain");
        assert_eq!(prompt(None, "# ROLE", Some("")).preview_text(), "# ROLE");
    }

    #[test]
    fn test_preview_status_serialization() {
        let value = serde_json::to_value(PreviewStatus::Failed("quota".to_string())).unwrap();
        assert_eq!(value, serde_json::json!({"status": "failed", "detail": "quota"}));
        let value = serde_json::to_value(PreviewStatus::NotRequested).unwrap();
        assert_eq!(value, serde_json::json!({"status": "not_requested"}));
    }
}
