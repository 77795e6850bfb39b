// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! File-backed log engine

mod allocate;
mod log;
pub mod meta;
mod naming;
mod record;
mod session;

pub use allocate::{Allocation, IdAllocator};
pub use log::{FileLog, FileLogFactory};
pub use meta::{CloseMeta, SessionMeta};
pub use naming::{record_file_name, session_dir_name};
pub use record::FileRecord;
pub use session::FileSession;
