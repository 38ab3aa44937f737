//! CLI entrypoint and subcommand orchestration.

mod config;
mod serve;
#[cfg(test)]
mod test_support;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use proto::{Envelope, WireFormat};
use tokio::io::{AsyncReadExt, BufReader};
use tools::{Adapter, InMemoryIdempotencyStore, PlaceholderTool, SchemaScaffoldTool};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, ToolKind};

/// Top-level command-line arguments for the custom tool adapter.
#[derive(Parser)]
#[command(name = "custom-tool")]
#[command(about = "Custom tool adapter speaking the v1 envelope protocol", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.custom-tool/logs
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Envelope rendering (flat, structured); overrides the config file
    #[arg(short, long)]
    format: Option<WireFormat>,

    #[command(subcommand)]
    command: Commands,
}

/// CLI subcommands available in the application.
#[derive(Subcommand)]
enum Commands {
    /// Print the capability descriptor
    Capabilities,

    /// Dispatch a single request (read from stdin when no source is given)
    Handle {
        /// Request JSON text
        #[arg(short = 'r', long)]
        request: Option<String>,

        /// File containing the request JSON
        #[arg(long, conflicts_with = "request")]
        file: Option<PathBuf>,
    },

    /// Answer JSON-lines requests on stdin until EOF or `/quit`
    Serve,
}

impl Commands {
    fn label(&self) -> &'static str {
        match self {
            Commands::Capabilities => "capabilities",
            Commands::Handle { .. } => "handle",
            Commands::Serve => "serve",
        }
    }
}

#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _file_guard = init_tracing(&cli.log_level, cli.debug);

    if cli.debug {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command = cli.command.label(),
            log_level = %cli.log_level,
            "========== custom-tool start =========="
        );
    }

    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Failed to load config ({e}), using defaults");
        Config::default()
    });
    let format = cli.format.unwrap_or(config.adapter.format);
    let adapter = build_adapter(&config);

    match cli.command {
        Commands::Capabilities => {
            let envelope = adapter.capabilities();
            print_envelope(&mut std::io::stdout().lock(), &envelope, format)
        }
        Commands::Handle { request, file } => cmd_handle(&adapter, format, request, file).await,
        Commands::Serve => cmd_serve(&adapter, format).await,
    }
}

/// Initializes tracing on stderr, plus a daily debug log file with `--debug`.
///
/// Stdout carries envelopes only, so console logs never go there.
fn init_tracing(log_level: &str, debug: bool) -> Option<WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    if !debug {
        tracing_subscriber::registry().with(console).init();
        return None;
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let log_dir = PathBuf::from(home).join(".custom-tool").join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();
    Some(guard)
}

/// Creates the adapter described by the configuration.
fn build_adapter(config: &Config) -> Adapter {
    let adapter = match config.tool.kind {
        ToolKind::Placeholder => Adapter::new(PlaceholderTool::new()),
        ToolKind::SchemaScaffold => {
            Adapter::new(SchemaScaffoldTool::with_dir(&config.tool.schemas_dir))
        }
    };
    let adapter = if config.adapter.validate {
        adapter
    } else {
        adapter.without_validation()
    };
    if !config.adapter.idempotency {
        return adapter;
    }
    let store = match config.adapter.idempotency_ttl() {
        Some(ttl) => InMemoryIdempotencyStore::with_ttl(ttl),
        None => InMemoryIdempotencyStore::new(),
    }
    .with_max_entries(config.adapter.idempotency_max_entries);
    adapter.with_idempotency(Arc::new(store))
}

/// Reads one request from the flag, a file, or stdin, and prints its envelope.
async fn cmd_handle(
    adapter: &Adapter,
    format: WireFormat,
    request: Option<String>,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let text = match (request, file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?,
        (None, None) => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };

    let envelope = serve::dispatch_text(adapter, &text).await;
    print_envelope(&mut std::io::stdout().lock(), &envelope, format)?;
    Ok(())
}

/// Runs the JSON-lines loop on stdin/stdout.
async fn cmd_serve(adapter: &Adapter, format: WireFormat) -> anyhow::Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    serve::serve(adapter, format, input, tokio::io::stdout()).await?;
    Ok(())
}

/// Writes one rendered envelope line; a closed stdout surfaces as an error.
fn print_envelope(
    out: &mut impl Write,
    envelope: &Envelope,
    format: WireFormat,
) -> anyhow::Result<()> {
    writeln!(out, "{}", serve::render_line(envelope, format))
        .and_then(|()| out.flush())
        .map_err(|e| anyhow::anyhow!("failed to write envelope: {e}"))
}
