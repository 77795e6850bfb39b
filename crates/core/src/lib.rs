// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! deferlog-core: shared vocabulary for the deferlog engines
//!
//! This crate provides:
//! - Capability traits implemented by the file engine and the deferred layer
//! - Labels, props, linked tokens and payloads
//! - Completion handles and the call buffer used for deferred replay
//! - Flush arbiters, lifecycle listeners and engine configuration
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod arbiter;
pub mod call_buffer;
pub mod clock;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod labels;
pub mod lifecycle;
pub mod payload;
pub mod token;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use arbiter::{FlushArbiter, FlushPolicy, FlushTrigger};
pub use call_buffer::{CallBuffer, Replay};
pub use clock::{format_timestamp, Clock, FakeClock, SystemClock};
pub use completion::{pair, Completer, Completion};
pub use config::{EngineConfig, DEFAULT_DIRECTORY_TEMPLATE, DEFAULT_ID_RETRY_LIMIT, ROOT_ENV};
pub use engine::{EngineFactory, LogEngine, LogRecord, LogSession, RecordOf, Sink};
pub use error::LogError;
pub use id::{random_id, to_base36, FixedSeed, IdScheme, SeedSource, SequentialSeed, SystemSeed};
pub use labels::{
    extension_for, labels_to_props, mime_to_data_label, mime_to_data_type, sanitize_name,
    DataType, Label, LabelSet, Props, RecordType, SessionType, LINKED_TOKENS_KEY, USER_DATA_KEY,
};
pub use lifecycle::{when_fired, Lifecycle, Listeners};
pub use payload::Payload;
pub use token::{LinkedToken, Relation, TokenType};
