//! Plain-text rendering for the terminal

use shared::{Interpretation, PromptStructure, PublishedPrompt, field_label, format_likes, interpret};

use crate::consumer::SnapshotStatus;

fn render_structure(out: &mut String, heading: &str, structure: &PromptStructure, localize: bool) {
    out.push_str(heading);
    out.push('\n');
    for (name, value) in structure.fields() {
        let label = if localize { field_label(name) } else { name.as_str() };
        out.push_str(&format!("  {label}: {value}\n"));
    }
    out.push_str(&format!("  copy: {}\n", structure.flatten()));
}

/// Structured view of a finished result; `None` for opaque text, which is
/// already on screen as streamed
pub fn render_interpretation(interpretation: &Interpretation) -> Option<String> {
    if !interpretation.is_structured() {
        return None;
    }

    let mut out = String::new();
    if let Some(english) = interpretation.english().filter(|s| !s.is_empty()) {
        render_structure(&mut out, "English", english, true);
    }
    if let Some(chinese) = interpretation.chinese().filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push('\n');
        }
        render_structure(&mut out, "中文", chinese, false);
    }
    Some(out)
}

/// One-line notice for a stream that did not complete cleanly
pub fn status_notice(status: &SnapshotStatus) -> Option<String> {
    match status {
        SnapshotStatus::Streaming | SnapshotStatus::Completed => None,
        SnapshotStatus::Truncated => Some("⚠️  stream ended early, the result may be incomplete".to_string()),
        SnapshotStatus::Cancelled => Some("⏹  cancelled".to_string()),
        SnapshotStatus::Failed(reason) => Some(format!("❌ stream failed: {reason}")),
    }
}

/// Gallery card: id, title, category, likes and preview text
pub fn render_card(prompt: &PublishedPrompt) -> String {
    let author = prompt
        .author
        .as_ref()
        .and_then(|a| a.username.as_deref())
        .unwrap_or("anonymous");
    format!(
        "#{:<5} {} [{}] ♥ {} by {}\n       {}",
        prompt.id,
        prompt.title,
        prompt.category(),
        format_likes(prompt.likes),
        author,
        prompt.preview_text().replace('\n', " ")
    )
}

/// Full prompt: header, optional image and the content in its structured
/// form when it has one
pub fn render_detail(prompt: &PublishedPrompt) -> String {
    let mut out = format!(
        "{}\n[{}] ♥ {}\n",
        prompt.title,
        prompt.category(),
        format_likes(prompt.likes)
    );
    if let Some(image_url) = &prompt.image_url {
        out.push_str(&format!("image: {image_url}\n"));
    }
    out.push('\n');
    let interpretation = interpret(&prompt.content);
    match render_interpretation(&interpretation) {
        Some(structured) => out.push_str(&structured),
        None => {
            out.push_str(&prompt.content);
            out.push('\n');
        }
    }
    out
}
