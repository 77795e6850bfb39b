// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred log over the file engine

use crate::log::DeferredLog;
use deferlog_core::{EngineConfig, FlushTrigger};
use deferlog_storage::{FileLog, FileLogFactory};

/// A deferred file log configured by `config`
///
/// `trigger` backs the `on_trigger` flush policy; other policies ignore it.
pub fn deferred_file_log(config: EngineConfig, trigger: &FlushTrigger) -> DeferredLog<FileLog> {
    let arbiter = config.arbiter(trigger);
    DeferredLog::with_arbiter(FileLogFactory::new(config), arbiter)
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
