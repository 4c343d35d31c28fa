#![forbid(unsafe_code)]

//! `nitrogen-sidecar` — stdio bridge binary.
//!
//! Bootstraps configuration and logging, then runs the session loop over
//! the process's stdin/stdout. Logs go to stderr; stdout is reserved for
//! the wire protocol.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use nitrogen_sidecar::session::Session;
use nitrogen_sidecar::{AppError, Result, Settings};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "nitrogen-sidecar", about = "Stdio bridge to a NitroGen inference server", version, long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the inference-server endpoint.
    #[arg(long)]
    addr: Option<String>,

    /// Override the request/reply exchange timeout, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    // The dispatch loop is strictly sequential; one thread is enough.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut settings = match args.config {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::default(),
    };

    if let Some(addr) = args.addr {
        settings.server_addr = addr;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.timeout_ms = timeout_ms;
    }
    // CLI overrides bypass the parse-time checks, so validate again.
    settings.validate()?;

    info!(
        addr = %settings.server_addr,
        timeout_ms = settings.timeout_ms,
        "nitrogen-sidecar starting"
    );

    Session::new(settings)
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Stdout carries the wire protocol, so logs must go to stderr.
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
