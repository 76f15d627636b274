// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PEACH FC command-line client
//!
//! Signs a member in by magic link, shows the next event and notice, lists
//! the schedule, and records RSVPs.

mod cli;

use anyhow::Context as _;
use clap::Parser;
use peach_fc::{config::Config, Club};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize structured JSON logging on stderr
    init_logging();

    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;
    tracing::debug!(team = %config.team_name, "Starting PEACH FC client");

    let club = Club::connect(config)?;

    // Restore the stored session and keep its token fresh before any request.
    // A failure is logged and the command still runs.
    if let Err(e) = club.sessions.init().await {
        tracing::warn!(error = %e, kind = e.kind(), "Session restore failed; continuing signed out");
    } else if let Err(e) = club.sessions.refresh_if_expiring().await {
        tracing::warn!(error = %e, kind = e.kind(), "Token refresh failed");
    }

    cli.invoke(&club).await
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("peach_fc=info,warn")),
        )
        .with(format)
        .init();
}
