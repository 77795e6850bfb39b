// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Meta and close records of a file session

use deferlog_core::{LinkedToken, LogError, Props, SessionType};
pub use deferlog_core::{LINKED_TOKENS_KEY, USER_DATA_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROTOCOL: &str = "deferlog";
pub const API: &str = "deferlog-rs";
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Contents of a session's first record, rewritten in place on change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionMeta {
    pub protocol: String,
    pub api: String,
    pub api_version: String,
    pub log_session: String,
    pub parent_session: Option<String>,
    #[serde(default)]
    pub linked_tokens: Vec<LinkedToken>,
    pub session_type: SessionType,
    pub time_stamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub user_data: Map<String, Value>,
    /// Caller-defined session properties
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionMeta {
    /// Build the meta of a new session from its props
    ///
    /// Tokens and user data recorded before the session existed travel in
    /// the props under [`LINKED_TOKENS_KEY`] and [`USER_DATA_KEY`].
    pub fn new(
        id: &str,
        parent: Option<String>,
        props: &Props,
        time_stamp: String,
    ) -> Result<Self, LogError> {
        let mut extra = props.extra.clone();
        let linked_tokens = match extra.remove(LINKED_TOKENS_KEY) {
            Some(tokens) => serde_json::from_value(tokens)?,
            None => Vec::new(),
        };
        let user_data = match extra.remove(USER_DATA_KEY) {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(LogError::Config(format!(
                    "{USER_DATA_KEY} must be an object, got {other}"
                )))
            }
            None => Map::new(),
        };
        Ok(Self {
            protocol: PROTOCOL.to_string(),
            api: API.to_string(),
            api_version: API_VERSION.to_string(),
            log_session: id.to_string(),
            parent_session: parent,
            linked_tokens,
            session_type: props.session_type.unwrap_or(SessionType::Generic),
            time_stamp,
            name: props.name.clone(),
            user_data,
            extra,
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>, LogError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Contents of the terminal record written when a session closes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloseMeta {
    pub time_stamp: String,
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
