//! Bulk import of prompts and their images
//!
//! Rows are processed one at a time, in file order. A failing row is logged
//! and counted; it never stops the run.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use shared::{Category, NewPrompt, ServiceId, logging, service_debug, service_error, service_info, service_warn, summarize};
use webserver::BackendService;

use crate::error::{ImporterError, ImporterResult};
use crate::source::{ImportRow, SourceKind};

pub const DEFAULT_STYLE: &str = "Nano Banana Style";
pub const DEFAULT_MAX_RANDOM_LIKES: i64 = 20;
pub const UNTITLED: &str = "未命名作品";
pub const DESCRIPTION_CHARS: usize = 150;
pub const CSV_UPLOAD_PREFIX: &str = "batch_import";

/// How a run treats its rows
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub kind: SourceKind,
    pub images_dir: PathBuf,
    pub author_id: Uuid,
    /// 1-based; earlier rows are passed over
    pub start_from: usize,
    /// Style recorded next to each CSV prompt
    pub style: String,
    /// Initial likes are drawn from `0..max_random_likes`
    pub max_random_likes: i64,
}

impl ImportOptions {
    pub fn new(kind: SourceKind, images_dir: impl Into<PathBuf>, author_id: Uuid) -> Self {
        Self {
            kind,
            images_dir: images_dir.into(),
            author_id,
            start_from: 1,
            style: DEFAULT_STYLE.to_string(),
            max_random_likes: DEFAULT_MAX_RANDOM_LIKES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingFields,
    Duplicate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingFields => write!(f, "missing image name or prompt"),
            SkipReason::Duplicate => write!(f, "already imported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Imported { id: i64, with_image: bool },
    Skipped(SkipReason),
}

/// Totals printed at the end of a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "imported {}, skipped {}, failed {}",
            self.imported, self.skipped, self.failed
        )
    }
}

/// Stored content for a CSV prompt: a one-field structure plus the style
pub fn structured_content(prompt: &str, style: &str) -> String {
    json!({ "english_structure": { "subject": prompt, "style": style } }).to_string()
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// `image/png` for `.png` files, `image/jpeg` for anything else
pub fn content_type(file_name: &str) -> &'static str {
    match extension(file_name).as_deref() {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// MIME type and stored extension of a manifest image. Files without an
/// extension are treated as JPEG.
pub fn image_format(file_name: &str) -> (&'static str, String) {
    let ext = extension(file_name).unwrap_or_else(|| "jpg".to_string());
    let mime = match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "image/jpeg",
    };
    (mime, ext)
}

pub struct ImportJob<B, R> {
    backend: B,
    options: ImportOptions,
    rng: R,
}

impl<B, R> ImportJob<B, R>
where
    B: BackendService,
    R: Rng,
{
    pub fn new(backend: B, options: ImportOptions, rng: R) -> Self {
        Self { backend, options, rng }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import every row from `start_from` on
    pub async fn run(&mut self, rows: &[ImportRow]) -> ImportSummary {
        let service = ServiceId::current();
        let pending: Vec<&ImportRow> = rows.iter().filter(|row| row.number >= self.options.start_from).collect();
        logging::log_progress(
            service,
            "Import",
            &format!("{} of {} rows, starting at row {}", pending.len(), rows.len(), self.options.start_from),
        );

        let mut summary = ImportSummary::default();
        for row in pending {
            match self.import_row(row).await {
                Ok(RowOutcome::Imported { id, with_image }) => {
                    summary.imported += 1;
                    service_info!(service, row = row.number, id, with_image, title = row.title.as_deref().unwrap_or(UNTITLED), "Imported");
                }
                Ok(RowOutcome::Skipped(reason)) => {
                    summary.skipped += 1;
                    service_warn!(service, row = row.number, %reason, "Row skipped");
                }
                Err(e) => {
                    summary.failed += 1;
                    service_error!(service, row = row.number, error = %e, "Row failed");
                }
            }
        }
        summary
    }

    /// Import a single row
    pub async fn import_row(&mut self, row: &ImportRow) -> ImporterResult<RowOutcome> {
        let Some(prompt) = row.prompt.as_deref() else {
            return Ok(RowOutcome::Skipped(SkipReason::MissingFields));
        };
        // A manifest row may omit the image; a CSV row may not
        let image_name = row.image_name.as_deref();
        if image_name.is_none() && self.options.kind == SourceKind::Csv {
            return Ok(RowOutcome::Skipped(SkipReason::MissingFields));
        }
        let title = row.title.as_deref().unwrap_or(UNTITLED);

        if self
            .backend
            .find_prompt_by_title(title, self.options.author_id)
            .await?
            .is_some()
        {
            return Ok(RowOutcome::Skipped(SkipReason::Duplicate));
        }

        let category = match row.category.as_deref() {
            Some(label) => label.parse::<Category>()?,
            None => Category::Image,
        };
        let image_url = match image_name {
            Some(name) => self.store_image(row.number, name).await?,
            None => None,
        };

        let (content, description) = match self.options.kind {
            SourceKind::Csv => (structured_content(prompt, &self.options.style), Some(summarize(prompt, DESCRIPTION_CHARS))),
            SourceKind::Manifest => (prompt.to_string(), None),
        };
        let likes = match self.options.max_random_likes {
            max if max > 0 => self.rng.gen_range(0..max),
            _ => 0,
        };

        let new_prompt = NewPrompt {
            title: title.to_string(),
            content,
            description,
            category,
            author_id: self.options.author_id,
            image_url,
            is_public: true,
            likes,
        };
        let stored = self.backend.insert_prompt(&new_prompt).await?;
        Ok(RowOutcome::Imported {
            id: stored.id,
            with_image: new_prompt.image_url.is_some(),
        })
    }

    /// Upload the row's image and return its public URL. A manifest row whose
    /// file is absent becomes text-only; for a CSV row that is an error.
    async fn store_image(&self, number: usize, image_name: &str) -> ImporterResult<Option<String>> {
        let path = self.options.images_dir.join(image_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return match self.options.kind {
                    SourceKind::Csv => Err(ImporterError::MissingImage { path }),
                    SourceKind::Manifest => {
                        service_warn!(ServiceId::current(), row = number, image = image_name, "Image not found, importing text only");
                        Ok(None)
                    }
                };
            }
            Err(e) => return Err(e.into()),
        };

        let millis = Utc::now().timestamp_millis();
        let (object_path, mime, upsert) = match self.options.kind {
            SourceKind::Csv => (format!("{CSV_UPLOAD_PREFIX}/{millis}_{image_name}"), content_type(image_name), true),
            SourceKind::Manifest => {
                let (mime, ext) = image_format(image_name);
                (format!("{}/bulk_{millis}_{number}.{ext}", self.options.author_id), mime, false)
            }
        };

        service_debug!(ServiceId::current(), row = number, path = %object_path, size = bytes.len(), "Uploading image");
        self.backend.upload_object(&object_path, bytes, mime, upsert).await?;
        Ok(Some(self.backend.public_url(&object_path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_content_keeps_field_order() {
        assert_eq!(
            structured_content("a cat", "Nano Banana Style"),
            r#"{"english_structure":{"subject":"a cat","style":"Nano Banana Style"}}"#
        );
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type("cat.png"), "image/png");
        assert_eq!(content_type("CAT.PNG"), "image/png");
        assert_eq!(content_type("cat.jpg"), "image/jpeg");
        assert_eq!(content_type("cat"), "image/jpeg");
        assert_eq!(content_type("cat.webp"), "image/jpeg");
    }

    #[test]
    fn test_manifest_image_format_keeps_its_own_type() {
        assert_eq!(image_format("a.webp"), ("image/webp", "webp".to_string()));
        assert_eq!(image_format("a.GIF"), ("image/gif", "gif".to_string()));
        assert_eq!(image_format("a.jpeg"), ("image/jpeg", "jpeg".to_string()));
        assert_eq!(image_format("scan"), ("image/jpeg", "jpg".to_string()));
    }

    #[test]
    fn test_summary_line() {
        let summary = ImportSummary { imported: 3, skipped: 1, failed: 2 };
        assert_eq!(summary.to_string(), "imported 3, skipped 1, failed 2");
    }
}
