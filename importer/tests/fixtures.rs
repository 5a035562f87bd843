//! Test fixtures for importer integration tests

#![allow(dead_code)]

use shared::{NewPrompt, PublishedPrompt};

pub const CSV_HEADER: &str = "标题,输出图片 (Output),提示词 (Prompt)";

/// CSV text with the standard header
pub fn csv(rows: &[&str]) -> String {
    let mut text = String::from(CSV_HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

/// What the backend would hand back for an insert
pub fn inserted(new_prompt: &NewPrompt) -> PublishedPrompt {
    PublishedPrompt {
        id: 500,
        title: new_prompt.title.clone(),
        content: new_prompt.content.clone(),
        description: new_prompt.description.clone(),
        category: Some(new_prompt.category.label().to_string()),
        author_id: Some(new_prompt.author_id),
        image_url: new_prompt.image_url.clone(),
        likes: new_prompt.likes,
        is_public: true,
        created_at: None,
        author: None,
    }
}
