//! System instruction selection
//!
//! The instruction template is a pure function of the mode. Chat and code
//! templates are additionally filled with the language the generated section
//! bodies should be written in, decided by whether the user typed any CJK
//! character.

use shared::Mode;

use crate::types::{CompletionSpec, SamplingParams};

pub const MAX_OUTPUT_TOKENS: u32 = 8192;

const LANGUAGE_SLOT: &str = "{target_language}";

const CHAT_TEMPLATE: &str = r#"You are an elite prompt engineer at "PromptHub". Your goal is to write a **Meta-Prompt**.
**CRITICAL RULES:**
1. Do NOT act as the expert yourself.
2. Write a prompt that instructs ChatGPT/Claude to act as the expert.
3. Keep the # EXAMPLE section EXTREMELY BRIEF (max 100 words) so the answer is never cut off.

**OUTPUT FORMAT (Markdown):**
**# ROLE**
[Expert persona, written in {target_language}]
**# CONTEXT**
[Domain background, written in {target_language}]
**# TASK**
[Step-by-step instructions, written in {target_language}]
**# CONSTRAINTS**
[Limitations, written in {target_language}]
**# FORMAT**
[Expected answer structure, written in {target_language}]
**# EXAMPLE**
[Short snippet]
"#;

const CODE_TEMPLATE: &str = r#"You are a **Senior Software Architect** at "PromptHub".
The user asks for a coding solution. Design a robust CO-STAR prompt for another AI; do not write the solution yourself.

**OUTPUT FORMAT (Markdown):**
**# ROLE**
[Specific technical role, written in {target_language}]
**# CONTEXT**
[Tech stack and environment, written in {target_language}]
**# TASK**
[Step-by-step implementation plan, written in {target_language}]
**# CONSTRAINTS**
[Performance, security and maintainability requirements, written in {target_language}]
**# EXAMPLE**
[VERY BRIEF code snippet, max 10 lines]
"#;

const IMAGE_TEMPLATE: &str = r#"You are an image prompt generator for Midjourney, Flux and Stable Diffusion.
The user describes an image concept. Turn it into a detailed, high-quality picture description.
**RULES:**
1. Do NOT ask questions or act as a consultant.
2. Output ONE JSON object and nothing else: no Markdown, no code fences.
3. The object has exactly two attributes:
   - "english_structure": {"subject": "...", "art_direction": "...", "lighting_atmosphere": "...", "camera_gear": "..."}
   - "chinese_structure": {"主体": "...", "艺术风格": "...", "光影氛围": "...", "镜头参数": "..."}
4. Every value is a short comma-separated phrase. Leave a value as "" when it does not apply.
**EXAMPLE OUTPUT:**
{"english_structure":{"subject":"a cyberpunk cat with neon mechanical limbs on a rainy rooftop","art_direction":"hyper-realistic, cinematic","lighting_atmosphere":"night, volumetric fog, neon glow","camera_gear":"35mm lens, f/1.8, 8k"},"chinese_structure":{"主体":"雨夜屋顶上长着霓虹机械肢体的赛博朋克猫","艺术风格":"超写实，电影感","光影氛围":"夜晚，体积雾，霓虹光","镜头参数":"35mm 镜头，f/1.8，8k"}}
"#;

/// Language the generated section bodies are written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLanguage {
    English,
    SimplifiedChinese,
}

impl TargetLanguage {
    /// Chinese when the input contains any CJK character
    pub fn detect(user_input: &str) -> Self {
        if contains_cjk(user_input) {
            Self::SimplifiedChinese
        } else {
            Self::English
        }
    }

    /// Marker substituted into the template
    pub fn marker(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::SimplifiedChinese => "Simplified Chinese (简体中文)",
        }
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'   // unified ideographs
        | '\u{3400}'..='\u{4DBF}' // extension A
        | '\u{F900}'..='\u{FAFF}' // compatibility ideographs
    )
}

/// Substring presence only: one ideograph anywhere is enough
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// Unfilled template for a mode
pub fn template(mode: Mode) -> &'static str {
    match mode {
        Mode::Chat => CHAT_TEMPLATE,
        Mode::Image => IMAGE_TEMPLATE,
        Mode::Code => CODE_TEMPLATE,
    }
}

/// Template for `mode` with the target language filled in
pub fn system_instruction(mode: Mode, language: TargetLanguage) -> String {
    template(mode).replace(LANGUAGE_SLOT, language.marker())
}

/// Sampling: creative for images, deterministic for code, mid-range for chat
pub fn sampling(mode: Mode) -> SamplingParams {
    let (temperature, json_output) = match mode {
        Mode::Chat => (0.7, false),
        Mode::Image => (0.9, true),
        Mode::Code => (0.2, false),
    };
    SamplingParams { temperature, max_tokens: MAX_OUTPUT_TOKENS, json_output }
}

/// Complete request description for one optimization
pub fn build_completion(mode: Mode, user_input: &str) -> CompletionSpec {
    CompletionSpec {
        system: system_instruction(mode, TargetLanguage::detect(user_input)),
        user: user_input.to_string(),
        params: sampling(mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cjk_detection_is_substring_presence() {
        assert!(contains_cjk("héllo 你好"));
        assert!(contains_cjk("写一首诗"));
        assert!(contains_cjk("\u{3400}"));
        assert!(!contains_cjk("hello world"));
        assert!(!contains_cjk("こんにちは"));
        assert!(!contains_cjk(""));
    }

    #[test]
    fn test_template_depends_on_mode_only() {
        for mode in Mode::ALL {
            let a = build_completion(mode, "draw a cat");
            let b = build_completion(mode, "write a haiku about rust");
            assert_eq!(a.system, b.system, "mode {mode}");
            assert_eq!(a.params, b.params, "mode {mode}");
        }
        assert_ne!(template(Mode::Chat), template(Mode::Code));
        assert_ne!(template(Mode::Chat), template(Mode::Image));
        assert_ne!(template(Mode::Image), template(Mode::Code));
    }

    #[test]
    fn test_language_marker_for_chat_and_code() {
        for mode in [Mode::Chat, Mode::Code] {
            let zh = build_completion(mode, "héllo 你好");
            assert!(zh.system.contains("Simplified Chinese (简体中文)"));
            assert!(!zh.system.contains(LANGUAGE_SLOT));

            let en = build_completion(mode, "hello");
            assert!(en.system.contains("written in English"));
            assert!(!en.system.contains("简体中文"));
        }
    }

    #[test]
    fn test_image_instruction_asks_for_both_structures() {
        let spec = build_completion(Mode::Image, "一只猫");
        assert!(spec.system.contains("english_structure"));
        assert!(spec.system.contains("chinese_structure"));
        assert_eq!(spec.system, template(Mode::Image));
        assert!(spec.params.json_output);
    }

    #[test]
    fn test_sampling_per_mode() {
        assert!(sampling(Mode::Image).temperature > sampling(Mode::Chat).temperature);
        assert!(sampling(Mode::Code).temperature < sampling(Mode::Chat).temperature);
        assert!(!sampling(Mode::Chat).json_output);
        for mode in Mode::ALL {
            assert_eq!(sampling(mode).max_tokens, MAX_OUTPUT_TOKENS);
        }
    }

    #[test]
    fn test_user_text_is_passed_through() {
        let spec = build_completion(Mode::Chat, "  keep my spacing ");
        assert_eq!(spec.user, "  keep my spacing ");
    }
}
