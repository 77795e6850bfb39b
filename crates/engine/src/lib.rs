// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Deferred log, session and record decorators
//!
//! Every call is accepted immediately and buffered; the real engine, session
//! and record are created only once the flush arbiter lets a record through.

mod calls;
mod file;
mod log;
mod record;
mod session;

#[cfg(test)]
mod testing;

pub use file::deferred_file_log;
pub use log::DeferredLog;
pub use record::DeferredRecord;
pub use session::DeferredSession;
