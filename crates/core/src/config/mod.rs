// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration modules

mod engine;

pub use engine::{EngineConfig, DEFAULT_DIRECTORY_TEMPLATE, DEFAULT_ID_RETRY_LIMIT, ROOT_ENV};
