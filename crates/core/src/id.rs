// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier seeds and encodings

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Produces the numeric seed a session identifier allocation starts from
pub trait SeedSource: Send + Sync {
    fn seed(&self) -> u64;
}

/// Unix time in milliseconds
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemSeed;

impl SeedSource for SystemSeed {
    fn seed(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Always the same seed; forces collisions in tests
#[derive(Clone, Copy, Debug)]
pub struct FixedSeed(pub u64);

impl SeedSource for FixedSeed {
    fn seed(&self) -> u64 {
        self.0
    }
}

/// Increasing seeds for testing
#[derive(Clone, Debug)]
pub struct SequentialSeed {
    counter: Arc<AtomicU64>,
}

impl SequentialSeed {
    pub fn new(start: u64) -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(start)),
        }
    }
}

impl SeedSource for SequentialSeed {
    fn seed(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

/// How session identifiers are generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// Base-36 seed, incremented on collision
    #[default]
    Time,
    /// Random v4 UUID
    Uuid,
}

/// Lowercase base-36 encoding
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Random identifier for [`IdScheme::Uuid`]
pub fn random_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
