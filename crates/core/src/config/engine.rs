// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! Loaded from TOML; `DEFERLOG_ROOT` overrides the storage root.

use crate::arbiter::{FlushArbiter, FlushPolicy, FlushTrigger};
use crate::error::LogError;
use crate::id::IdScheme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`EngineConfig::root`]
pub const ROOT_ENV: &str = "DEFERLOG_ROOT";

pub const DEFAULT_DIRECTORY_TEMPLATE: &str = "{SessionIndex}-{SessionType}{SessionName}";

pub const DEFAULT_ID_RETRY_LIMIT: u32 = 10_000;

/// Settings for a log engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Storage root; missing or invalid roots fall back to the temp dir
    pub root: Option<PathBuf>,
    /// Session directory name with `{SessionIndex}`, `{SessionName}` and
    /// `{SessionType}` placeholders
    pub directory_template: String,
    pub id_scheme: IdScheme,
    /// Collision retries before giving up, `0` for unbounded
    pub id_retry_limit: u32,
    pub flush_policy: FlushPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: None,
            directory_template: DEFAULT_DIRECTORY_TEMPLATE.to_string(),
            id_scheme: IdScheme::default(),
            id_retry_limit: DEFAULT_ID_RETRY_LIMIT,
            flush_policy: FlushPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_directory_template(mut self, template: impl Into<String>) -> Self {
        self.directory_template = template.into();
        self
    }

    pub fn with_id_scheme(mut self, scheme: IdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    /// Parse TOML and validate
    pub fn from_toml(text: &str) -> Result<Self, LogError> {
        let config: Self = toml::from_str(text).map_err(|e| LogError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self, LogError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LogError::io("reading config", path, e))?;
        Self::from_toml(&text)
    }

    /// Apply environment overrides
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (testable form of [`Self::with_env`])
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = lookup(ROOT_ENV).filter(|r| !r.is_empty()) {
            self.root = Some(PathBuf::from(root));
        }
        self
    }

    /// The template must name `{SessionIndex}` and stay a single path segment
    pub fn validate(&self) -> Result<(), LogError> {
        let template = &self.directory_template;
        if !template.contains("{SessionIndex}") {
            return Err(LogError::InvalidTemplate(format!(
                "{template:?} lacks {{SessionIndex}}"
            )));
        }
        if template.contains('/') || template.contains('\\') {
            return Err(LogError::InvalidTemplate(format!(
                "{template:?} must not contain path separators"
            )));
        }
        Ok(())
    }

    /// Arbiter for the configured policy
    pub fn arbiter(&self, trigger: &FlushTrigger) -> FlushArbiter {
        self.flush_policy.arbiter(trigger)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
