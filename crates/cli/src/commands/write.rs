// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `deferlog write <text>` - one record in a fresh session

use anyhow::{anyhow, Context, Result};
use clap::Args;
use deferlog_core::{
    EngineConfig, FlushTrigger, Label, LabelSet, LogEngine, LogSession, Payload, SessionType,
};
use deferlog_engine::deferred_file_log;
use std::path::PathBuf;

#[derive(Args)]
pub struct WriteArgs {
    /// Record contents
    pub text: String,

    /// Storage root (overrides the config)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Parent session identifier
    #[arg(long)]
    pub parent: Option<String>,

    /// Session name, appended to the directory name
    #[arg(long)]
    pub name: Option<String>,

    /// Session type: generic, server-request or app-run
    #[arg(long, value_parser = parse_session_type)]
    pub session_type: Option<SessionType>,

    /// Record label such as DATA_TEXT or RECORD_DEBUG; other values name the record
    #[arg(short, long = "label")]
    pub labels: Vec<String>,

    /// Parse the contents as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn parse_session_type(value: &str) -> Result<SessionType, String> {
    SessionType::parse(&value.to_ascii_uppercase().replace('-', "_"))
        .ok_or_else(|| format!("unknown session type: {value}"))
}

/// Write the record and return the session directory
pub async fn write(args: WriteArgs, config: EngineConfig) -> Result<PathBuf> {
    let config = match args.root {
        Some(root) => config.with_root(root),
        None => config,
    };
    let log = deferred_file_log(config, &FlushTrigger::new());

    let mut session_labels = Vec::new();
    if let Some(session_type) = args.session_type {
        session_labels.push(Label::Session(session_type));
    }
    if let Some(name) = args.name {
        session_labels.push(Label::Name(name));
    }
    let session = log.session(args.parent, session_labels);

    let payload = if args.json {
        Payload::Json(serde_json::from_str(&args.text).context("parsing JSON contents")?)
    } else {
        Payload::Text(args.text)
    };
    let labels = (!args.labels.is_empty()).then(|| LabelSet::from(args.labels));

    let written = session.write(payload, labels);
    // An explicit write persists whatever the flush policy says
    session.flush();
    written.await.context("writing record")?;
    session.close().await.context("closing session")?;
    log.wait().await?;

    if log.real().is_some_and(|engine| engine.used_fallback()) {
        tracing::warn!("storage root unusable, wrote to the temp dir");
    }
    session
        .storage_path()
        .ok_or_else(|| anyhow!("session was never stored"))
}

#[cfg(test)]
#[path = "write_tests.rs"]
mod tests;
