// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `deferlog inspect` - list stored sessions

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;
use deferlog_core::SessionType;
use deferlog_storage::meta::SessionMeta;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

const META_FILE: &str = "1-META.json";

#[derive(Args)]
pub struct InspectArgs {
    /// Storage root (defaults to the configured one)
    #[arg(long)]
    pub root: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// One session directory as found on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub directory: String,
    pub log_session: String,
    pub parent_session: Option<String>,
    pub session_type: SessionType,
    pub time_stamp: String,
    /// Record files, meta and close records included
    pub records: usize,
    pub closed: bool,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<28} {:<14} {:<14} {:<24} {:>3} {}",
            self.directory,
            self.session_type.as_str(),
            self.parent_session.as_deref().unwrap_or("-"),
            self.time_stamp,
            self.records,
            if self.closed { "closed" } else { "open" }
        )
    }
}

/// Read every session directory under `root`, oldest first
///
/// Directories without a readable meta record are skipped.
pub fn scan(root: &Path) -> Result<Vec<SessionSummary>> {
    let entries =
        std::fs::read_dir(root).with_context(|| format!("reading {}", root.display()))?;
    let mut sessions = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        match summarize(&path) {
            Ok(Some(summary)) => sessions.push(summary),
            Ok(None) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping session"),
        }
    }
    sessions.sort_by(|a, b| {
        (a.time_stamp.as_str(), a.directory.as_str())
            .cmp(&(b.time_stamp.as_str(), b.directory.as_str()))
    });
    Ok(sessions)
}

fn summarize(dir: &Path) -> Result<Option<SessionSummary>> {
    let meta_path = dir.join(META_FILE);
    if !meta_path.is_file() {
        return Ok(None);
    }
    let meta: SessionMeta = serde_json::from_str(&std::fs::read_to_string(&meta_path)?)
        .with_context(|| format!("parsing {}", meta_path.display()))?;

    let mut records = 0;
    let mut closed = false;
    for entry in std::fs::read_dir(dir)?.flatten() {
        if !entry.path().is_file() {
            continue;
        }
        records += 1;
        closed |= entry.file_name().to_string_lossy().ends_with("-CLOSE.json");
    }

    Ok(Some(SessionSummary {
        directory: dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        log_session: meta.log_session,
        parent_session: meta.parent_session,
        session_type: meta.session_type,
        time_stamp: meta.time_stamp,
        records,
        closed,
    }))
}

#[cfg(test)]
#[path = "inspect_tests.rs"]
mod tests;
