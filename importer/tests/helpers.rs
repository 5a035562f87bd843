//! Test helper utilities for importer integration tests

#![allow(dead_code)]

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;
use uuid::Uuid;

use importer::{ImportJob, ImportOptions, SourceKind};
use webserver::traits::MockBackendService;

pub fn author() -> Uuid {
    Uuid::parse_str("00000000-0000-0000-0000-0000000000b1").unwrap()
}

/// Images directory holding the given files
pub fn images_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, bytes) in files {
        std::fs::write(dir.path().join(name), bytes).unwrap();
    }
    dir
}

pub fn options(kind: SourceKind, images: &Path) -> ImportOptions {
    ImportOptions::new(kind, images, author())
}

pub fn job(backend: MockBackendService, options: ImportOptions) -> ImportJob<MockBackendService, StdRng> {
    ImportJob::new(backend, options, StdRng::seed_from_u64(7))
}

/// Backend with no stored prompts that serves public URLs under `https://cdn/`
pub fn empty_backend() -> MockBackendService {
    let mut backend = MockBackendService::new();
    backend.expect_find_prompt_by_title().returning(|_, _| Ok(None));
    backend
        .expect_public_url()
        .returning(|path| format!("https://cdn/{path}"));
    backend
}
