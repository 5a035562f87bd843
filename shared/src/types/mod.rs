//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::{SharedError, SharedResult};

/// Global service ID, set once at binary start-up
static SERVICE_ID: OnceLock<ServiceId> = OnceLock::new();

/// Identifier for the binary that is currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceId {
    /// HTTP server hosting the optimizer endpoint and gallery API
    WebServer,
    /// `prompthub` command line client
    Client,
    /// Batch import tool
    Importer,
}

impl ServiceId {
    /// Initialize the global service ID for the webserver
    pub fn init_webserver() -> &'static ServiceId {
        SERVICE_ID.get_or_init(|| ServiceId::WebServer)
    }

    /// Initialize the global service ID for the CLI client
    pub fn init_client() -> &'static ServiceId {
        SERVICE_ID.get_or_init(|| ServiceId::Client)
    }

    /// Initialize the global service ID for the importer
    pub fn init_importer() -> &'static ServiceId {
        SERVICE_ID.get_or_init(|| ServiceId::Importer)
    }

    /// Get the global service ID. Library code used from tests runs without
    /// initialisation, so this falls back to the webserver.
    pub fn current() -> &'static ServiceId {
        SERVICE_ID.get_or_init(|| ServiceId::WebServer)
    }

    /// Crate name used as the tracing target for this service
    pub fn target(&self) -> &'static str {
        match self {
            ServiceId::WebServer => "webserver",
            ServiceId::Client => "client",
            ServiceId::Importer => "importer",
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target())
    }
}

/// Generation mode selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Chat,
    Image,
    Code,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Chat, Mode::Image, Mode::Code];

    /// Gallery category a result of this mode is published under
    pub fn category(&self) -> Category {
        match self {
            Mode::Chat => Category::Chat,
            Mode::Image => Category::Image,
            Mode::Code => Category::Code,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Chat => write!(f, "chat"),
            Mode::Image => write!(f, "image"),
            Mode::Code => write!(f, "code"),
        }
    }
}

impl FromStr for Mode {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Mode::Chat),
            "image" => Ok(Mode::Image),
            "code" => Ok(Mode::Code),
            _ => Err(SharedError::InvalidMode { input: s.to_string() }),
        }
    }
}

/// Gallery category, persisted as the label shown in the gallery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "对话", alias = "AI 助手")]
    Chat,
    #[serde(rename = "绘画")]
    Image,
    #[serde(rename = "编程")]
    Code,
}

impl Category {
    /// Label stored in the `category` column
    pub fn label(&self) -> &'static str {
        match self {
            Category::Chat => "对话",
            Category::Image => "绘画",
            Category::Code => "编程",
        }
    }

    /// Read a stored column value. Legacy and missing values count as chat.
    pub fn from_stored(value: Option<&str>) -> Category {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(Category::Chat)
    }

    /// Parse a gallery filter. `全部`/`all`/empty mean "no filter".
    pub fn parse_filter(value: Option<&str>) -> SharedResult<Option<Category>> {
        match value.map(str::trim) {
            None | Some("") | Some("全部") => Ok(None),
            Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
            Some(v) => v.parse().map(Some),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Category {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "对话" | "AI 助手" => Ok(Category::Chat),
            "绘画" => Ok(Category::Image),
            "编程" => Ok(Category::Code),
            other => other
                .parse::<Mode>()
                .map(|mode| mode.category())
                .map_err(|_| SharedError::InvalidCategory { input: s.to_string() }),
        }
    }
}

/// Like counter as shown on gallery cards
pub fn format_likes(count: i64) -> String {
    match count {
        c if c <= 0 => "0".to_string(),
        c if c > 99 => "99+".to_string(),
        c => c.to_string(),
    }
}

/// Character-safe prefix of `text`, at most `max_chars` characters long
pub fn summarize(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_and_display() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
        assert_eq!(" Image ".parse::<Mode>().unwrap(), Mode::Image);
        assert!("video".parse::<Mode>().is_err());
        assert_eq!(Mode::default(), Mode::Chat);
    }

    #[test]
    fn test_mode_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Code).unwrap(), "\"code\"");
        let mode: Mode = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(mode, Mode::Image);
    }

    #[test]
    fn test_category_labels_round_trip_through_storage() {
        assert_eq!(serde_json::to_string(&Category::Image).unwrap(), "\"绘画\"");
        let legacy: Category = serde_json::from_str("\"AI 助手\"").unwrap();
        assert_eq!(legacy, Category::Chat);
        assert_eq!(Category::from_stored(None), Category::Chat);
        assert_eq!(Category::from_stored(Some("AI 助手")), Category::Chat);
        assert_eq!(Category::from_stored(Some("编程")), Category::Code);
    }

    #[test]
    fn test_category_filter() {
        use tokio_test::{assert_err, assert_ok};

        assert_eq!(assert_ok!(Category::parse_filter(None)), None);
        assert_eq!(Category::parse_filter(Some("全部")).unwrap(), None);
        assert_eq!(Category::parse_filter(Some("ALL")).unwrap(), None);
        assert_eq!(Category::parse_filter(Some("绘画")).unwrap(), Some(Category::Image));
        assert_eq!(Category::parse_filter(Some("code")).unwrap(), Some(Category::Code));
        assert_err!(Category::parse_filter(Some("music")));
    }

    #[test]
    fn test_format_likes() {
        assert_eq!(format_likes(-3), "0");
        assert_eq!(format_likes(0), "0");
        assert_eq!(format_likes(42), "42");
        assert_eq!(format_likes(99), "99");
        assert_eq!(format_likes(100), "99+");
    }

    #[test]
    fn test_summarize_respects_char_boundaries() {
        assert_eq!(summarize("你好世界", 2), "你好");
        assert_eq!(summarize("short", 100), "short");
        assert_eq!(summarize("", 5), "");
    }
}
