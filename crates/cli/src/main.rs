// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! deferlog - write and inspect deferred session logs

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{inspect, write};
use deferlog_core::EngineConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "deferlog",
    version,
    about = "deferlog - session logs that only touch disk when they matter"
)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a session, write one record and close it
    Write(write::WriteArgs),
    /// List the sessions stored under a root
    Inspect(inspect::InspectArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Write(args) => {
            let dir = write::write(args, config).await?;
            println!("{}", dir.display());
        }
        Commands::Inspect(args) => {
            let format = args.format;
            let root = args
                .root
                .or(config.root)
                .context("no storage root: pass --root or set one in the config")?;
            let sessions = inspect::scan(&root)?;
            if sessions.is_empty() {
                eprintln!("No sessions under {}", root.display());
            } else {
                output::print_list(&sessions, format);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let config = config.with_env();
    tracing::debug!(root = ?config.root, policy = ?config.flush_policy, "config loaded");
    Ok(config)
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
