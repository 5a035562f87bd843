//! Bulk importer for the PromptHub gallery
//!
//! Loads prompts from a CSV export or a JSON manifest, uploads their images
//! to the backend bucket and inserts public gallery rows.

pub mod error;
pub mod job;
pub mod source;

pub use error::{ImporterError, ImporterResult};
pub use job::{ImportJob, ImportOptions, ImportSummary, RowOutcome, SkipReason};
pub use source::{ImportRow, SourceKind, parse_csv, parse_manifest, read_source};
