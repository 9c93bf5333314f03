// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use folio_session::command::{self, Command};
use folio_session::ClientConfig;

/// Command-line client for the folio session layer.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about)]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    /// Log filter (tracing EnvFilter syntax).
    #[arg(long, default_value = "warn", env = "FOLIO_LOG_LEVEL")]
    log_level: String,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "FOLIO_LOG_FORMAT")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let level = if cli.config.debug { "debug" } else { cli.log_level.as_str() };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = match cli.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = command::run(&cli.config, cli.command).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
