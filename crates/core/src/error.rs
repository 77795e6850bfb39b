// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type shared by every log engine

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported through completions of log, session and record operations
#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is closed: {0}")]
    RecordClosed(String),
    #[error("session is closed: {0}")]
    SessionClosed(String),
    #[error("session close failed for {id}: {reason}")]
    CloseFailed { id: String, reason: String },
    #[error("record open failed for {id} after {attempts} attempts: {reason}")]
    OpenFailed {
        id: String,
        attempts: u32,
        reason: String,
    },
    #[error("no free session identifier after {attempts} attempts under {root}")]
    IdSpaceExhausted { root: PathBuf, attempts: u32 },
    #[error("invalid directory template: {0}")]
    InvalidTemplate(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("operation was abandoned before completing")]
    Abandoned,
}

impl LogError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// True when the error came from the filesystem
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
