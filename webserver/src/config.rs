//! Start-up configuration resolved from the environment
//!
//! Every external collaborator is configured once in `main` and then injected.
//! Variables are read through a lookup function so that tests can supply their
//! own values without touching the process environment.
//!
//! ## Chat provider
//! - `SILICONFLOW_API_KEY`: SiliconFlow, preferred when present
//! - `OPENAI_API_KEY` + optional `OPENAI_BASE_URL`: any OpenAI-compatible API
//!
//! ## Backend
//! - `SUPABASE_URL` (or `NEXT_PUBLIC_SUPABASE_URL`)
//! - `SUPABASE_ANON_KEY` (or `NEXT_PUBLIC_SUPABASE_ANON_KEY`)
//! - `SUPABASE_SERVICE_ROLE_KEY`: optional, used for server-side writes

use std::time::Duration;

use url::Url;

use crate::error::{WebServerError, WebServerResult};

pub const SILICONFLOW_BASE_URL: &str = "https://api.siliconflow.cn/v1";
pub const SILICONFLOW_CHAT_MODEL: &str = "deepseek-ai/DeepSeek-V3";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_OPENAI_MODEL: &str = "deepseek-chat";

pub const IMAGE_MODEL: &str = "black-forest-labs/FLUX.1-schnell";
pub const IMAGE_SIZE: &str = "1024x1024";
pub const IMAGE_PROMPT_MAX_CHARS: usize = 500;

pub const IMAGE_BUCKET: &str = "prompt-images";

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn first_of(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| non_empty(lookup, key))
}

fn parse_url(field: &str, value: &str) -> WebServerResult<String> {
    Url::parse(value)
        .map_err(|e| WebServerError::config(format!("{field} is not a valid URL ({value}): {e}")))?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Chat-completion provider, chosen once at start-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatProvider {
    SiliconFlow { api_key: String },
    OpenAiCompatible { api_key: String, base_url: String },
}

impl ChatProvider {
    /// Resolve the provider from a variable lookup.
    /// SiliconFlow wins when both keys are set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> WebServerResult<Self> {
        if let Some(api_key) = non_empty(&lookup, "SILICONFLOW_API_KEY") {
            return Ok(Self::SiliconFlow { api_key });
        }

        let api_key = non_empty(&lookup, "OPENAI_API_KEY").ok_or_else(|| {
            WebServerError::config("No chat provider key: set SILICONFLOW_API_KEY or OPENAI_API_KEY")
        })?;
        let base_url = match non_empty(&lookup, "OPENAI_BASE_URL") {
            Some(url) => parse_url("OPENAI_BASE_URL", &url)?,
            None => DEFAULT_OPENAI_BASE_URL.to_string(),
        };
        Ok(Self::OpenAiCompatible { api_key, base_url })
    }

    pub fn from_env() -> WebServerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn base_url(&self) -> &str {
        match self {
            Self::SiliconFlow { .. } => SILICONFLOW_BASE_URL,
            Self::OpenAiCompatible { base_url, .. } => base_url,
        }
    }

    pub fn api_key(&self) -> &str {
        match self {
            Self::SiliconFlow { api_key } | Self::OpenAiCompatible { api_key, .. } => api_key,
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            Self::SiliconFlow { .. } => SILICONFLOW_CHAT_MODEL,
            Self::OpenAiCompatible { .. } => DEFAULT_OPENAI_MODEL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SiliconFlow { .. } => "siliconflow",
            Self::OpenAiCompatible { .. } => "openai-compatible",
        }
    }

    /// Full URL of the chat-completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url().trim_end_matches('/'))
    }
}

/// Image-generation provider settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub size: String,
}

impl ImageProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: SILICONFLOW_BASE_URL.to_string(),
            model: IMAGE_MODEL.to_string(),
            size: IMAGE_SIZE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `None` when no SiliconFlow key is configured; image generation is
    /// then disabled rather than failing start-up.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        non_empty(&lookup, "SILICONFLOW_API_KEY").map(Self::new)
    }

    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn generations_url(&self) -> String {
        format!("{}/images/generations", self.base_url.trim_end_matches('/'))
    }
}

/// Storage/database/auth backend settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub service_role_key: Option<String>,
    pub bucket: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> WebServerResult<Self> {
        let url = parse_url("SUPABASE_URL", &url.into())?;
        Ok(Self {
            url,
            anon_key: anon_key.into(),
            service_role_key: None,
            bucket: IMAGE_BUCKET.to_string(),
        })
    }

    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> WebServerResult<Self> {
        let url = first_of(&lookup, &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"])
            .ok_or_else(|| WebServerError::config("SUPABASE_URL is not set"))?;
        let anon_key = first_of(&lookup, &["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"])
            .ok_or_else(|| WebServerError::config("SUPABASE_ANON_KEY is not set"))?;

        let mut config = Self::new(url, anon_key)?;
        config.service_role_key = non_empty(&lookup, "SUPABASE_SERVICE_ROLE_KEY");
        Ok(config)
    }

    pub fn from_env() -> WebServerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Key used for writes made on the server's own behalf
    pub fn write_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.anon_key)
    }
}

/// Upstream time bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP/TLS connect to a provider
    pub connect: Duration,
    /// Until the first upstream fragment arrives
    pub establish: Duration,
    /// Between two upstream fragments
    pub idle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            establish: Duration::from_secs(60),
            idle: Duration::from_secs(60),
        }
    }
}

impl Timeouts {
    pub fn from_secs(connect: u64, establish: u64, idle: u64) -> Self {
        Self {
            connect: Duration::from_secs(connect),
            establish: Duration::from_secs(establish),
            idle: Duration::from_secs(idle),
        }
    }
}
