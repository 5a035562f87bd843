//! `prompthub` command line client
//!
//! Streams optimizer results live to stdout and browses the gallery.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use shared::{
    Credentials, Mode, PreviewDecision, PreviewStatus, PublishRequest, ServiceId, interpret, logging, service_info,
};
use tokio::signal;

use client::render::{render_card, render_detail, render_interpretation, status_notice};
use client::{ClientError, ClientResult, PromptHubClient, SnapshotStatus, StreamConsumer};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "prompthub")]
#[command(about = "Optimize prompts and browse the PromptHub gallery")]
struct Args {
    /// Server base URL
    #[arg(long, env = "PROMPTHUB_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Access token from `prompthub login`
    #[arg(long, env = "PROMPTHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream an optimized prompt
    Optimize {
        /// What you want a prompt for
        text: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Chat)]
        mode: ModeArg,

        /// Publish the result to the gallery once it is complete
        #[arg(long, requires = "title")]
        publish: bool,

        /// Title of the published prompt
        #[arg(long)]
        title: Option<String>,

        /// Generate a preview image when publishing an image result
        #[arg(long)]
        preview: bool,
    },
    /// List public prompts
    Gallery {
        /// Category label or mode name; `all` for everything
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one prompt
    Show { id: i64 },
    /// Toggle your like on a prompt
    Like { id: i64 },
    /// Your own or liked prompts
    Mine {
        #[arg(long, value_enum, default_value_t = Tab::Created)]
        tab: Tab,
    },
    /// Log in and print the access token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROMPTHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PROMPTHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Generate a preview image for a prompt
    Image { prompt: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Chat,
    Image,
    Code,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Chat => Mode::Chat,
            ModeArg::Image => Mode::Image,
            ModeArg::Code => Mode::Code,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Tab {
    Created,
    Liked,
}

impl Tab {
    fn as_str(self) -> &'static str {
        match self {
            Tab::Created => "created",
            Tab::Liked => "liked",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let service = ServiceId::init_client();
    logging::init_tracing(Some(&args.log_level));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            if e.is_unauthorized() {
                eprintln!("   run `prompthub login` and export PROMPTHUB_TOKEN");
            }
            logging::log_error(service, "prompthub failed", &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> ClientResult<()> {
    let api = PromptHubClient::new(&args.url)?.with_token(args.token);

    match args.command {
        Command::Optimize { text, mode, publish, title, preview } => {
            let mode = Mode::from(mode);
            let content = optimize(&args.url, &text, mode).await?;
            if publish {
                let Some(content) = content else {
                    return Err(ClientError::InvalidInput("an incomplete result is not published".to_string()));
                };
                let request = PublishRequest {
                    title: title.unwrap_or_default(),
                    content,
                    mode,
                    preview: if preview { PreviewDecision::Generate } else { PreviewDecision::Skip },
                };
                let outcome = api.publish(&request).await?;
                println!("✅ published as #{}", outcome.prompt.id);
                match outcome.preview {
                    PreviewStatus::Generated(url) => println!("🖼  preview: {url}"),
                    PreviewStatus::Failed(reason) => eprintln!("⚠️  preview failed, published without image: {reason}"),
                    PreviewStatus::NotRequested => {}
                }
            }
        }
        Command::Gallery { category, limit } => {
            for prompt in api.gallery(category.as_deref(), limit).await? {
                println!("{}", render_card(&prompt));
            }
        }
        Command::Show { id } => print!("{}", render_detail(&api.prompt(id).await?)),
        Command::Like { id } => {
            let outcome = api.like(id).await?;
            let verb = if outcome.liked { "liked" } else { "unliked" };
            println!("{verb} #{id} (♥ {})", shared::format_likes(outcome.likes));
        }
        Command::Mine { tab } => {
            for prompt in api.my_prompts(tab.as_str()).await? {
                println!("{}", render_card(&prompt));
            }
        }
        Command::Login { email, password } => {
            let session = api.login(&Credentials { email, password }).await?;
            println!("{}", session.access_token);
        }
        Command::Signup { email, password } => {
            let outcome = api.signup(&Credentials { email, password }).await?;
            match outcome.session {
                Some(session) => println!("{}", session.access_token),
                None => println!("📧 account created for {}, confirm your e-mail and then log in", outcome.user.id),
            }
        }
        Command::Image { prompt } => {
            let response = api.generate_image(&prompt).await?;
            match (response.image_url, response.error) {
                (Some(url), _) => println!("{url}"),
                (None, error) => {
                    let reason = error.unwrap_or_else(|| "no image returned".to_string());
                    return Err(ClientError::Server { status: 200, message: reason });
                }
            }
        }
    }
    Ok(())
}

/// Stream one result to stdout as it arrives. Returns the text when the
/// stream completed cleanly.
async fn optimize(base_url: &str, text: &str, mode: Mode) -> ClientResult<Option<String>> {
    let consumer = StreamConsumer::new(base_url)?;
    let handle = consumer.start(&shared::OptimizationRequest::new(text, mode)).await?;
    service_info!(ServiceId::current(), %mode, "Streaming result");

    let token = handle.cancellation_token();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let mut snapshots = handle.snapshots();
    let mut printed = 0;
    let mut stdout = std::io::stdout();
    loop {
        {
            let snapshot = snapshots.borrow_and_update();
            if snapshot.text.len() > printed {
                stdout.write_all(snapshot.text[printed..].as_bytes())?;
                stdout.flush()?;
                printed = snapshot.text.len();
            }
            if snapshot.status.is_final() {
                break;
            }
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }

    let last = handle.finish().await?;
    if last.text.len() > printed {
        stdout.write_all(last.text[printed..].as_bytes())?;
    }
    println!();

    if let Some(notice) = status_notice(&last.status) {
        eprintln!("{notice}");
    }
    if mode == Mode::Image {
        if let Some(structured) = render_interpretation(&interpret(&last.text)) {
            println!("\n{structured}");
        }
    }

    Ok((last.status == SnapshotStatus::Completed).then_some(last.text))
}
