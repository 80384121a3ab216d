//! Photo Genius CLI
//!
//! `serve` runs the HTTP gateway. `remove` drives the client workflow end to
//! end against a running gateway: capture → remove background → download.

use super::config::CliConfigBuilder;
use crate::{
    client::HttpGatewayClient,
    config::ClientConfig,
    controller::{ActionOutcome, AlertSink, PresentationController},
    server,
    tracing_config::{init_cli_tracing, spans},
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Instrument};

/// Remove image backgrounds through a hosted inference provider
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "photo-genius")]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console, global = true)]
    pub log_format: CliLogFormat,

    /// Write logs to a daily-rotated file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP gateway exposing POST /api/remove-background
    Serve(ServeArgs),
    /// Upload a photo to a running gateway and save the processed result
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Provider credential
    #[arg(long, env = "FAL_KEY", hide_env_values = true)]
    pub fal_key: Option<String>,

    /// Background-removal model on the provider
    #[arg(long, default_value = crate::config::DEFAULT_MODEL_ID)]
    pub model: String,

    /// Provider queue base URL
    #[arg(long, default_value = crate::config::DEFAULT_QUEUE_URL)]
    pub queue_url: String,

    /// Delay between provider status polls, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub poll_interval_ms: u64,

    /// Largest accepted request body, in MiB
    #[arg(long, default_value_t = 20)]
    pub max_payload_mb: usize,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Image file to upload
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file [default: <downloads>/processed_image.png]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Base URL of the gateway
    #[arg(short, long, default_value = "http://127.0.0.1:3000", env = "PHOTO_GENIUS_SERVER")]
    pub server: String,

    /// Encoding used for the upload
    #[arg(short, long, value_enum, default_value_t = CliCaptureFormat::Jpeg)]
    pub format: CliCaptureFormat,

    /// JPEG quality (0-100)
    #[arg(long, default_value_t = crate::services::DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Directory for temporary download files [default: system temp]
    #[arg(long, value_name = "PATH")]
    pub scratch_dir: Option<PathBuf>,

    /// Print the raw provider result as JSON on stdout
    #[arg(long)]
    pub print_result: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliLogFormat {
    /// Colored human-readable output
    Console,
    /// Plain output for CI and containers
    Compact,
    /// One JSON object per event
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliCaptureFormat {
    Jpeg,
    Png,
    Webp,
}

/// Alert sink for terminals: messages go straight to stderr
struct StderrAlertSink;

impl AlertSink for StderrAlertSink {
    fn alert(&self, message: &str) {
        eprintln!("❌ {message}");
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let tracing = CliConfigBuilder::tracing_config(&cli).context("Invalid logging arguments")?;
    init_cli_tracing(tracing).context("Failed to initialize tracing")?;

    match &cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Remove(args) => remove(args).await,
    }
}

async fn serve(args: &ServeArgs) -> Result<()> {
    let config = CliConfigBuilder::server_config(args).context("Invalid server arguments")?;
    let span = spans::server(&config.host, config.port);
    server::run(config).instrument(span).await
}

async fn remove(args: &RemoveArgs) -> Result<()> {
    let config = CliConfigBuilder::client_config(args).context("Invalid arguments")?;
    let destination = match &args.output {
        Some(path) => path.clone(),
        None => default_output_dir().join(&config.download_file_name),
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let span = spans::session(&session_id, &args.input);
    run_session(args, config, &destination).instrument(span).await
}

async fn run_session(args: &RemoveArgs, config: ClientConfig, destination: &Path) -> Result<()> {
    let service = HttpGatewayClient::new(&config).context("Failed to create HTTP client")?;
    info!(endpoint = %service.endpoint(), "Using gateway");
    let controller =
        PresentationController::new(config, Arc::new(service), Arc::new(StderrAlertSink));

    controller
        .load_file(&args.input)
        .await
        .with_context(|| format!("Could not read {} as an image", args.input.display()))?;

    let spinner = start_spinner("Processing...");
    let outcome = controller.remove_background().await;
    spinner.finish_and_clear();
    let processed = match outcome.context("Background removal failed")? {
        ActionOutcome::Completed(processed) => processed,
        ActionOutcome::Ignored => bail!("Background removal is not available"),
    };
    info!(url = %processed.url, "Processed image ready");

    if args.print_result {
        println!("{}", serde_json::to_string_pretty(processed.result.as_value())?);
    }

    let spinner = start_spinner("Downloading...");
    let outcome = controller.download_to(destination).await;
    spinner.finish_and_clear();
    match outcome.context("Download failed")? {
        ActionOutcome::Completed(path) => {
            eprintln!("✅ Saved {}", path.display());
            Ok(())
        },
        ActionOutcome::Ignored => bail!("Download is not available"),
    }
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn start_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
