// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability traits shared by the file engine and the deferred layer
//!
//! Operations that touch storage are submitted synchronously, in call
//! order, and report their outcome through a [`Completion`].

use crate::completion::Completion;
use crate::error::LogError;
use crate::labels::{LabelSet, Props};
use crate::payload::Payload;
use crate::token::LinkedToken;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// Byte sink: all that stream mirroring collaborators need from a record
pub trait Sink: Send + Sync {
    /// Append `data`; writes land in submission order
    fn write(&self, data: Vec<u8>) -> Completion;

    /// Finish the sink after every submitted write
    fn close(&self) -> Completion;
}

/// An append-only entry of a session
pub trait LogRecord: Sink + Clone + 'static {
    /// Storage identifier (the file name for file records)
    fn id(&self) -> Option<String>;

    /// 1-based position within the owning session
    fn sequence(&self) -> Option<u64>;

    fn path(&self) -> Option<PathBuf>;

    fn props(&self) -> Props;

    /// Writes submitted but not yet persisted
    fn pending_writes(&self) -> usize;

    fn is_idle(&self) -> bool {
        self.pending_writes() == 0
    }

    /// Resolves once the record is idle
    fn wait(&self) -> Completion;
}

/// A unit of work holding ordered records
pub trait LogSession: Clone + Send + Sync + 'static {
    type Record: LogRecord;

    fn id(&self) -> Option<String>;

    /// Position of the session within its log
    fn index(&self) -> Option<u64>;

    fn parent_id(&self) -> Option<String>;

    fn storage_path(&self) -> Option<PathBuf>;

    fn props(&self) -> Props;

    /// Open a record classified by `labels` (record defaults fill the rest)
    fn open_record(&self, labels: LabelSet) -> Completion<Self::Record>;

    /// Open a record, write `payload` once and close it
    fn write(&self, payload: Payload, labels: Option<LabelSet>) -> Completion;

    /// Identifiers of records currently open
    fn open_records(&self) -> Vec<String>;

    /// Identifiers of finished records indexed by sequence - 1; records
    /// that failed leave `None` holes
    fn logged_records(&self) -> Vec<Option<String>>;

    fn set_parent_session(&self, parent: String) -> Completion;

    fn add_linked_token(&self, token: LinkedToken) -> Completion;

    fn set_user_data(&self, key: String, value: Value) -> Completion;

    fn is_idle(&self) -> bool;

    /// Resolves once the session is idle
    fn wait(&self) -> Completion;

    /// Close after the session is idle; repeated calls share the outcome
    fn close(&self) -> Completion;
}

/// Root persistence engine owning sessions
pub trait LogEngine: Clone + Send + Sync + 'static {
    type Session: LogSession;

    fn open_session(&self, parent: Option<String>, labels: LabelSet)
        -> Completion<Self::Session>;

    fn open_sessions(&self) -> Vec<String>;

    fn logged_sessions(&self) -> Vec<String>;

    fn storage_root(&self) -> Option<PathBuf>;

    /// Resolves once no session is open
    fn wait(&self) -> Completion;
}

/// Builds a concrete engine on demand, resolving its arguments late
#[async_trait]
pub trait EngineFactory: Send + Sync + 'static {
    type Engine: LogEngine;

    async fn build(&self) -> Result<Self::Engine, LogError>;
}

pub type RecordOf<E> = <<E as LogEngine>::Session as LogSession>::Record;
