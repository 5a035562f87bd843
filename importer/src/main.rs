//! Bulk importer entry point
//!
//! Writes go through the service-role key, so `SUPABASE_SERVICE_ROLE_KEY`
//! must be set next to the usual backend variables.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{ArgGroup, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use shared::{ServiceId, logging};
use uuid::Uuid;

use importer::job::{DEFAULT_MAX_RANDOM_LIKES, DEFAULT_STYLE};
use importer::{ImportJob, ImportOptions, ImportSummary, SourceKind, read_source};
use webserver::SupabaseClient;
use webserver::config::{BackendConfig, Timeouts};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "importer")]
#[command(about = "Bulk-load prompts and their images into the PromptHub gallery")]
#[command(group(ArgGroup::new("source").required(true).args(["csv", "manifest"])))]
struct Args {
    /// CSV export with 标题/Title, 输出图片 (Output) and 提示词 (Prompt) columns
    #[arg(long)]
    csv: Option<PathBuf>,

    /// JSON manifest: [{ title, content, category?, imageFileName }]
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Directory holding the referenced image files
    #[arg(long, default_value = "images")]
    images: PathBuf,

    /// Author recorded on every imported prompt
    #[arg(long, env = "IMPORT_AUTHOR_ID")]
    author: Uuid,

    /// First row to import (1-based)
    #[arg(long, default_value_t = 1)]
    start_from: usize,

    /// Style stored with each CSV prompt
    #[arg(long, default_value = DEFAULT_STYLE)]
    style: String,

    /// Upper bound (exclusive) of the random initial like count
    #[arg(long, default_value_t = DEFAULT_MAX_RANDOM_LIKES)]
    max_random_likes: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let service = ServiceId::init_importer();
    logging::init_tracing(Some(&args.log_level));

    match run(args).await {
        Ok(summary) => {
            println!("🏁 {summary}");
            logging::log_success(service, &format!("Import finished: {summary}"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {e:#}");
            logging::log_error(service, "Import", &format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ImportSummary> {
    let service = ServiceId::current();

    let (kind, path) = match (args.csv, args.manifest) {
        (Some(path), _) => (SourceKind::Csv, path),
        (None, Some(path)) => (SourceKind::Manifest, path),
        (None, None) => bail!("either --csv or --manifest is required"),
    };
    let rows = read_source(kind, &path).with_context(|| format!("loading {}", path.display()))?;

    let config = BackendConfig::from_env().context("backend configuration")?;
    if config.service_role_key.is_none() {
        bail!("SUPABASE_SERVICE_ROLE_KEY is required for imports");
    }
    let backend = SupabaseClient::new(config, &Timeouts::default()).context("creating backend client")?;

    logging::log_startup(
        service,
        &format!("import of {} rows from {} as {}", rows.len(), path.display(), args.author),
    );

    let options = ImportOptions {
        kind,
        images_dir: args.images,
        author_id: args.author,
        start_from: args.start_from,
        style: args.style,
        max_random_likes: args.max_random_likes,
    };
    let mut job = ImportJob::new(backend, options, StdRng::from_entropy());
    Ok(job.run(&rows).await)
}
