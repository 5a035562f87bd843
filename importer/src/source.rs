//! Import sources: a spreadsheet export (CSV) or a JSON manifest
//!
//! Both are read into the same [`ImportRow`] shape. Rows are numbered from 1
//! in file order so that `--start-from` can resume a partial run.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ImporterError, ImporterResult};

pub const TITLE_COLUMNS: [&str; 2] = ["标题", "Title"];
pub const IMAGE_COLUMN: &str = "输出图片 (Output)";
pub const PROMPT_COLUMN: &str = "提示词 (Prompt)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Manifest,
}

/// One candidate prompt. Blank fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub number: usize,
    pub title: Option<String>,
    pub prompt: Option<String>,
    pub image_name: Option<String>,
    pub category: Option<String>,
}

fn present(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_string()
}

/// Parse a CSV export. Header names are matched after trimming and BOM
/// removal; missing columns simply leave the field empty.
pub fn parse_csv<R: Read>(input: R) -> ImporterResult<Vec<ImportRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let title_columns: Vec<usize> = TITLE_COLUMNS.iter().filter_map(|name| column(*name)).collect();
    let image_column = column(IMAGE_COLUMN);
    let prompt_column = column(PROMPT_COLUMN);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let field = |col: Option<usize>| col.and_then(|c| record.get(c)).and_then(present);

        rows.push(ImportRow {
            number: index + 1,
            title: title_columns.iter().find_map(|&c| field(Some(c))),
            prompt: field(prompt_column),
            image_name: field(image_column),
            category: None,
        });
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    image_file_name: Option<String>,
}

impl ManifestEntry {
    /// Content is usually a string; structured content is stored as its JSON text
    fn content_text(&self) -> Option<String> {
        match &self.content {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => present(text),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Parse a manifest: `[{ title, content, category?, imageFileName }]`
pub fn parse_manifest(input: &str) -> ImporterResult<Vec<ImportRow>> {
    let entries: Vec<ManifestEntry> = serde_json::from_str(input)?;
    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| ImportRow {
            number: index + 1,
            prompt: entry.content_text(),
            title: entry.title.as_deref().and_then(present),
            image_name: entry.image_file_name.as_deref().and_then(present),
            category: entry.category.as_deref().and_then(present),
        })
        .collect())
}

/// Read and parse a source file
pub fn read_source(kind: SourceKind, path: &Path) -> ImporterResult<Vec<ImportRow>> {
    let bytes = std::fs::read(path).map_err(|source| ImporterError::ReadSource {
        path: path.to_path_buf(),
        source,
    })?;
    match kind {
        SourceKind::Csv => parse_csv(bytes.as_slice()),
        SourceKind::Manifest => parse_manifest(String::from_utf8_lossy(&bytes).trim_start_matches('\u{feff}')),
    }
}
