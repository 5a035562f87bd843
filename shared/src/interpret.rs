//! Structured-content interpreter
//!
//! Image-mode results are expected to be a JSON object carrying an English and
//! a Chinese description of the picture. Anything else, including valid JSON
//! without either of those attributes, is treated as opaque Markdown text.

use serde_json::{Map, Value};

pub const ENGLISH_KEY: &str = "english_structure";
pub const CHINESE_KEY: &str = "chinese_structure";

/// Field names the image instruction asks for, in display order
pub const ENGLISH_FIELDS: [&str; 4] = ["subject", "art_direction", "lighting_atmosphere", "camera_gear"];
pub const CHINESE_FIELDS: [&str; 4] = ["主体", "艺术风格", "光影氛围", "镜头参数"];

/// Ordered field name → value mapping of one language
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptStructure {
    fields: Vec<(String, String)>,
}

impl PromptStructure {
    /// Build from a JSON object, keeping document order. Only strings and
    /// numbers are shown: strings are trimmed and dropped when empty, numbers
    /// (including `0`) are kept as written. Booleans, nulls, arrays and
    /// nested objects are not displayable field values and are dropped.
    fn from_object(object: &Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                (!text.is_empty()).then(|| (key.clone(), text))
            })
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All values joined with `", "`, used for copy and as image prompt
    pub fn flatten(&self) -> String {
        self.fields
            .iter()
            .map(|(_, value)| value.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of interpreting a complete optimizer response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    Structured {
        english: Option<PromptStructure>,
        chinese: Option<PromptStructure>,
    },
    Opaque(String),
}

impl Interpretation {
    pub fn is_structured(&self) -> bool {
        matches!(self, Interpretation::Structured { .. })
    }

    pub fn english(&self) -> Option<&PromptStructure> {
        match self {
            Interpretation::Structured { english, .. } => english.as_ref(),
            Interpretation::Opaque(_) => None,
        }
    }

    pub fn chinese(&self) -> Option<&PromptStructure> {
        match self {
            Interpretation::Structured { chinese, .. } => chinese.as_ref(),
            Interpretation::Opaque(_) => None,
        }
    }

    /// Copyable text: the English structure when present, otherwise the
    /// Chinese one. Opaque text is returned unchanged.
    pub fn flatten(&self) -> String {
        match self {
            Interpretation::Structured { english, chinese } => english
                .as_ref()
                .or(chinese.as_ref())
                .map(PromptStructure::flatten)
                .unwrap_or_default(),
            Interpretation::Opaque(text) => text.clone(),
        }
    }
}

/// Interpret a complete response text
pub fn interpret(text: &str) -> Interpretation {
    let Ok(Value::Object(root)) = serde_json::from_str::<Value>(text) else {
        return Interpretation::Opaque(text.to_string());
    };

    let structure = |key: &str| match root.get(key) {
        Some(Value::Object(object)) => Some(PromptStructure::from_object(object)),
        _ => None,
    };
    let english = structure(ENGLISH_KEY);
    let chinese = structure(CHINESE_KEY);

    if english.is_none() && chinese.is_none() {
        return Interpretation::Opaque(text.to_string());
    }
    Interpretation::Structured { english, chinese }
}

/// Text sent to the image generator for a result: the flattened English
/// structure, or the raw text when there is none
pub fn image_prompt(text: &str) -> String {
    match interpret(text) {
        Interpretation::Structured { english: Some(english), .. } if !english.is_empty() => english.flatten(),
        _ => text.to_string(),
    }
}

/// Human label for a known English field
pub fn field_label(name: &str) -> &str {
    match name {
        "subject" => "Subject",
        "art_direction" => "Art Direction",
        "lighting_atmosphere" => "Lighting & Atmosphere",
        "camera_gear" => "Camera & Gear",
        "style" => "Style",
        other => other,
    }
}
