// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payloads accepted by one-shot session writes

use crate::labels::{DataType, Label, LabelSet, Props, RecordType};
use serde_json::Value;
use std::error::Error;

/// Data handed to a one-shot session write
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
    /// An error rendered with its source chain
    Error(String),
}

impl Payload {
    /// Capture an error and every source below it, one per line
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut rendered = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            rendered.push_str("\ncaused by: ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        Payload::Error(rendered)
    }

    /// Labels used when the caller supplies none
    pub fn default_labels(&self) -> LabelSet {
        let (record, data) = match self {
            Payload::Error(_) => (RecordType::Exception, DataType::Text),
            Payload::Text(_) => (RecordType::Generic, DataType::Text),
            Payload::Json(_) => (RecordType::Generic, DataType::Json),
            Payload::Bytes(_) => (RecordType::Generic, DataType::Binary),
        };
        LabelSet::Labels(vec![Label::Record(record), Label::Data(data)])
    }

    /// Resolve `labels` (or the payload's defaults) into record props
    pub fn props(&self, labels: Option<LabelSet>) -> Props {
        labels
            .unwrap_or_else(|| self.default_labels())
            .into_props(Some(&Props::record_defaults()))
    }

    /// Bytes to persist for a record classified by `props`
    pub fn into_bytes(self, props: &Props) -> Result<Vec<u8>, serde_json::Error> {
        Ok(match self {
            Payload::Text(text) | Payload::Error(text) => text.into_bytes(),
            Payload::Bytes(bytes) => bytes,
            Payload::Json(Value::String(text)) if props.data_type != Some(DataType::Json) => {
                text.into_bytes()
            }
            Payload::Json(value) => serde_json::to_vec(&value)?,
        })
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}
