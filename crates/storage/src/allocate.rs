// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier allocation
//!
//! An identifier is taken by creating its directory. A directory that
//! already exists is a collision and the next candidate is tried; any
//! other error fails the allocation.

use crate::naming::session_dir_name;
use deferlog_core::{random_id, to_base36, IdScheme, LogError, Props, SeedSource};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// An allocated identifier and the directory created for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub id: String,
    pub dir: PathBuf,
}

/// Per-log identifier allocator
pub struct IdAllocator {
    scheme: IdScheme,
    seed: Arc<dyn SeedSource>,
    last: Mutex<Option<u64>>,
    retry_limit: u32,
}

impl IdAllocator {
    pub fn new(scheme: IdScheme, seed: Arc<dyn SeedSource>, retry_limit: u32) -> Self {
        Self {
            scheme,
            seed,
            last: Mutex::new(None),
            retry_limit,
        }
    }

    /// Next candidate identifier
    ///
    /// Time seeds never go backwards within one allocator, so concurrent
    /// allocations on the same log never race for the same name.
    fn candidate(&self) -> String {
        match self.scheme {
            IdScheme::Uuid => random_id(),
            IdScheme::Time => {
                let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
                let seed = match *last {
                    Some(prev) => self.seed.seed().max(prev.saturating_add(1)),
                    None => self.seed.seed(),
                };
                *last = Some(seed);
                to_base36(seed)
            }
        }
    }

    /// Create a fresh session directory under `root`
    pub async fn allocate(
        &self,
        root: &Path,
        template: &str,
        props: &Props,
    ) -> Result<Allocation, LogError> {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            let id = self.candidate();
            let dir = root.join(session_dir_name(template, &id, props));
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => return Ok(Allocation { id, dir }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(id, attempts, "session id collision");
                    if self.retry_limit != 0 && attempts > self.retry_limit {
                        return Err(LogError::IdSpaceExhausted {
                            root: root.to_path_buf(),
                            attempts,
                        });
                    }
                }
                Err(e) => return Err(LogError::io("creating session directory", dir, e)),
            }
        }
    }
}

#[cfg(test)]
#[path = "allocate_tests.rs"]
mod tests;
