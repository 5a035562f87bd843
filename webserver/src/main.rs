//! PromptHub webserver entry point
//!
//! Resolves every provider from the environment once, injects the real
//! clients into the server and serves until Ctrl+C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use shared::{ServiceId, logging, service_info, service_warn};
use tokio::signal;

use webserver::config::{BackendConfig, ChatProvider, ImageProviderConfig, Timeouts};
use webserver::core::RelayConfig;
use webserver::{RealChatClient, RealImageGenerator, SupabaseClient, WebServer, WebServerError, WebServerResult};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "PromptHub prompt optimizer and gallery server")]
struct Args {
    /// Port for HTTP server
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory served for every path outside the API
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Seconds allowed for connecting to a provider
    #[arg(long, default_value = "10")]
    connect_timeout: u64,

    /// Seconds allowed until the first upstream fragment
    #[arg(long, default_value = "60")]
    establish_timeout: u64,

    /// Seconds allowed between two upstream fragments
    #[arg(long, default_value = "60")]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let service = ServiceId::init_webserver();
    logging::init_tracing(Some(&args.log_level));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::log_error(service, "WebServer failed", &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> WebServerResult<()> {
    let service = ServiceId::current();

    let bind_address: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|e| WebServerError::config(format!("Invalid bind address: {e}")))?;

    let timeouts = Timeouts::from_secs(args.connect_timeout, args.establish_timeout, args.idle_timeout);
    let provider = ChatProvider::from_env()?;
    let image_config = ImageProviderConfig::from_env();
    let backend_config = BackendConfig::from_env()?;

    logging::log_startup(
        service,
        &format!("provider={} model={} bind={bind_address}", provider.name(), provider.model()),
    );
    if image_config.is_none() {
        service_warn!(service, "SILICONFLOW_API_KEY not set, preview images are disabled");
    }
    if backend_config.service_role_key.is_none() {
        service_warn!(service, "SUPABASE_SERVICE_ROLE_KEY not set, writes use the anon key");
    }

    // Initialize services with dependency injection
    let provider_name = provider.name();
    let chat_client = RealChatClient::new(provider, &timeouts)?;
    let images = RealImageGenerator::new(image_config, &timeouts)?;
    let image_generation = images.is_enabled();
    let backend = SupabaseClient::new(backend_config, &timeouts)?;

    let mut webserver = WebServer::new(chat_client, images, backend, RelayConfig::from_timeouts(&timeouts))
        .with_provider_name(provider_name)
        .with_image_generation(image_generation);
    if let Some(dir) = args.static_dir {
        webserver = webserver.with_static_dir(dir);
    }

    service_info!(service, "🚀 WebServer initialized");
    webserver.run(bind_address, shutdown_signal()).await
}

async fn shutdown_signal() {
    let service = ServiceId::current();
    match signal::ctrl_c().await {
        Ok(()) => logging::log_shutdown(service, "Received Ctrl+C signal"),
        Err(err) => {
            logging::log_error(service, "Signal handling", &err);
            // Without a signal handler the server runs until killed
            std::future::pending::<()>().await;
        }
    }
}
