// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record and session classification
//!
//! Symbolic tags such as `DATA_JSON` or `RECORD_META` are parsed into a
//! closed [`Label`] enum and folded into [`Props`]. Anything that is not a
//! known tag becomes the `Name` property.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload format of a record; decides the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Binary,
    Json,
    Xml,
    Text,
    Html,
    Jpeg,
    Png,
}

impl DataType {
    pub const ALL: [DataType; 7] = [
        DataType::Binary,
        DataType::Json,
        DataType::Xml,
        DataType::Text,
        DataType::Html,
        DataType::Jpeg,
        DataType::Png,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Binary => "BINARY",
            DataType::Json => "JSON",
            DataType::Xml => "XML",
            DataType::Text => "TEXT",
            DataType::Html => "HTML",
            DataType::Jpeg => "JPEG",
            DataType::Png => "PNG",
        }
    }

    /// File extension used by file-backed records
    pub fn extension(&self) -> &'static str {
        match self {
            DataType::Binary => "bin",
            DataType::Json => "json",
            DataType::Xml => "xml",
            DataType::Text => "txt",
            DataType::Html => "html",
            DataType::Jpeg => "jpg",
            DataType::Png => "png",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Extension for an optional data type; unknown types fall back to `bin`
pub fn extension_for(data_type: Option<DataType>) -> &'static str {
    data_type.map_or("bin", |t| t.extension())
}

/// What a record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    Generic,
    Meta,
    Close,
    Debug,
    Exception,
    Stream,
    ServerRequest,
    ServerEnv,
    ServerResponse,
    HttpRequest,
    HttpResponse,
}

impl RecordType {
    pub const ALL: [RecordType; 11] = [
        RecordType::Generic,
        RecordType::Meta,
        RecordType::Close,
        RecordType::Debug,
        RecordType::Exception,
        RecordType::Stream,
        RecordType::ServerRequest,
        RecordType::ServerEnv,
        RecordType::ServerResponse,
        RecordType::HttpRequest,
        RecordType::HttpResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Generic => "GENERIC",
            RecordType::Meta => "META",
            RecordType::Close => "CLOSE",
            RecordType::Debug => "DEBUG",
            RecordType::Exception => "EXCEPTION",
            RecordType::Stream => "STREAM",
            RecordType::ServerRequest => "SERVER_REQUEST",
            RecordType::ServerEnv => "SERVER_ENV",
            RecordType::ServerResponse => "SERVER_RESPONSE",
            RecordType::HttpRequest => "HTTP_REQUEST",
            RecordType::HttpResponse => "HTTP_RESPONSE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// What a session represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    Generic,
    ServerRequest,
    AppRun,
}

impl SessionType {
    pub const ALL: [SessionType; 3] = [
        SessionType::Generic,
        SessionType::ServerRequest,
        SessionType::AppRun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Generic => "GENERIC",
            SessionType::ServerRequest => "SERVER_REQUEST",
            SessionType::AppRun => "APP_RUN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Session props key carrying linked tokens recorded before the session existed
pub const LINKED_TOKENS_KEY: &str = "LinkedTokens";
/// Session props key carrying user data recorded before the session existed
pub const USER_DATA_KEY: &str = "UserData";

/// Classification properties of a record or session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Props {
    #[serde(rename = "RecordType", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    #[serde(rename = "DataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(rename = "SessionType", default, skip_serializing_if = "Option::is_none")]
    pub session_type: Option<SessionType>,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Caller-defined properties carried alongside the known ones
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults applied to records: `GENERIC` / `BINARY`
    pub fn record_defaults() -> Self {
        Self {
            record_type: Some(RecordType::Generic),
            data_type: Some(DataType::Binary),
            ..Self::default()
        }
    }

    /// Defaults applied to sessions: `GENERIC`
    pub fn session_defaults() -> Self {
        Self {
            session_type: Some(SessionType::Generic),
            ..Self::default()
        }
    }

    /// Build from a raw JSON object, typing the known keys
    pub fn from_map(map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map))
    }

    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_session_type(mut self, session_type: SessionType) -> Self {
        self.session_type = Some(session_type);
        self
    }

    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(sanitize_name(name.as_ref()));
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Overwrite every property that `other` sets
    pub fn merge(&mut self, other: Props) {
        if other.record_type.is_some() {
            self.record_type = other.record_type;
        }
        if other.data_type.is_some() {
            self.data_type = other.data_type;
        }
        if other.session_type.is_some() {
            self.session_type = other.session_type;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        self.extra.extend(other.extra);
    }

    /// Fill every property left unset from `defaults`
    pub fn fill_defaults(&mut self, defaults: &Props) {
        self.record_type = self.record_type.or(defaults.record_type);
        self.data_type = self.data_type.or(defaults.data_type);
        self.session_type = self.session_type.or(defaults.session_type);
        if self.name.is_none() {
            self.name.clone_from(&defaults.name);
        }
        for (key, value) in &defaults.extra {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// A single symbolic tag
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Data(DataType),
    Record(RecordType),
    Session(SessionType),
    Name(String),
    /// Raw overrides merged as-is
    Override(Props),
}

impl Label {
    /// Parse a tag such as `DATA_TEXT`; unknown tags become a name
    pub fn parse(tag: &str) -> Self {
        if let Some(t) = tag.strip_prefix("DATA_").and_then(DataType::parse) {
            return Label::Data(t);
        }
        if let Some(t) = tag.strip_prefix("RECORD_").and_then(RecordType::parse) {
            return Label::Record(t);
        }
        if let Some(t) = tag.strip_prefix("SESSION_").and_then(SessionType::parse) {
            return Label::Session(t);
        }
        Label::Name(tag.to_string())
    }

    /// Tag form of the label, `None` for names and overrides
    pub fn tag(&self) -> Option<String> {
        match self {
            Label::Data(t) => Some(format!("DATA_{}", t.as_str())),
            Label::Record(t) => Some(format!("RECORD_{}", t.as_str())),
            Label::Session(t) => Some(format!("SESSION_{}", t.as_str())),
            Label::Name(_) | Label::Override(_) => None,
        }
    }
}

impl From<&str> for Label {
    fn from(tag: &str) -> Self {
        Label::parse(tag)
    }
}

impl From<DataType> for Label {
    fn from(t: DataType) -> Self {
        Label::Data(t)
    }
}

impl From<RecordType> for Label {
    fn from(t: RecordType) -> Self {
        Label::Record(t)
    }
}

impl From<SessionType> for Label {
    fn from(t: SessionType) -> Self {
        Label::Session(t)
    }
}

impl From<Props> for Label {
    fn from(props: Props) -> Self {
        Label::Override(props)
    }
}

/// Either ready-made properties or an ordered list of labels
#[derive(Debug, Clone, PartialEq)]
pub enum LabelSet {
    Props(Props),
    Labels(Vec<Label>),
}

impl LabelSet {
    /// Resolve into properties, filling anything unset from `defaults`.
    ///
    /// When several labels set the same property the earliest one wins.
    pub fn into_props(self, defaults: Option<&Props>) -> Props {
        let mut props = match self {
            LabelSet::Props(props) => props,
            LabelSet::Labels(labels) => {
                let mut props = Props::default();
                for label in labels.into_iter().rev() {
                    match label {
                        Label::Data(t) => props.data_type = Some(t),
                        Label::Record(t) => props.record_type = Some(t),
                        Label::Session(t) => props.session_type = Some(t),
                        Label::Name(name) => props.name = Some(name),
                        Label::Override(other) => props.merge(other),
                    }
                }
                props
            }
        };
        if let Some(defaults) = defaults {
            props.fill_defaults(defaults);
        }
        if let Some(name) = props.name.as_deref() {
            props.name = Some(sanitize_name(name));
        }
        props
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        LabelSet::Labels(Vec::new())
    }
}

impl From<Props> for LabelSet {
    fn from(props: Props) -> Self {
        LabelSet::Props(props)
    }
}

impl From<Vec<Label>> for LabelSet {
    fn from(labels: Vec<Label>) -> Self {
        LabelSet::Labels(labels)
    }
}

impl<const N: usize> From<[Label; N]> for LabelSet {
    fn from(labels: [Label; N]) -> Self {
        LabelSet::Labels(labels.into())
    }
}

impl<const N: usize> From<[&str; N]> for LabelSet {
    fn from(tags: [&str; N]) -> Self {
        LabelSet::Labels(tags.iter().map(|t| Label::parse(t)).collect())
    }
}

impl From<&[&str]> for LabelSet {
    fn from(tags: &[&str]) -> Self {
        LabelSet::Labels(tags.iter().map(|t| Label::parse(t)).collect())
    }
}

impl From<Vec<String>> for LabelSet {
    fn from(tags: Vec<String>) -> Self {
        LabelSet::Labels(tags.iter().map(|t| Label::parse(t)).collect())
    }
}

/// Shorthand for `labels.into().into_props(defaults)`
pub fn labels_to_props(labels: impl Into<LabelSet>, defaults: Option<&Props>) -> Props {
    labels.into().into_props(defaults)
}

/// Replace everything outside `[a-zA-Z0-9_]` with `_`
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Map a MIME content type to a data type, ignoring parameters after `;`
pub fn mime_to_data_type(content_type: Option<&str>) -> Option<DataType> {
    let mime = content_type?.split(';').next()?.trim();
    match mime {
        "application/json" => Some(DataType::Json),
        "text/html" => Some(DataType::Html),
        "text/xml" | "application/xml" => Some(DataType::Xml),
        "text/plain" => Some(DataType::Text),
        "application/octet-stream" | "application/binary" => Some(DataType::Binary),
        _ => None,
    }
}

/// Like [`mime_to_data_type`] but yields the label, `Binary` when unknown
pub fn mime_to_data_label(content_type: Option<&str>) -> Label {
    Label::Data(mime_to_data_type(content_type).unwrap_or(DataType::Binary))
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
