// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linked tokens: descriptive relations between sessions

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the token's value refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Another log session identifier
    #[serde(rename = "LOGSESSION")]
    LogSession,
    /// An identifier owned by some external system
    External,
}

/// Direction of the relation, seen from the session carrying the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    Parent,
    Child,
    Sibling,
}

/// A token stored in a session's meta record.
///
/// Plain tokens are opaque strings; typed tokens describe a relation.
/// Neither form drives control flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkedToken {
    Plain(String),
    Typed {
        #[serde(rename = "Type")]
        kind: TokenType,
        #[serde(rename = "Relation")]
        relation: Relation,
        #[serde(rename = "Value")]
        value: String,
    },
}

impl LinkedToken {
    pub fn new(kind: TokenType, relation: Relation, value: impl Into<String>) -> Self {
        LinkedToken::Typed {
            kind,
            relation,
            value: value.into(),
        }
    }

    pub fn parent_session(id: impl Into<String>) -> Self {
        Self::new(TokenType::LogSession, Relation::Parent, id)
    }

    pub fn child_session(id: impl Into<String>) -> Self {
        Self::new(TokenType::LogSession, Relation::Child, id)
    }

    pub fn sibling_session(id: impl Into<String>) -> Self {
        Self::new(TokenType::LogSession, Relation::Sibling, id)
    }

    pub fn value(&self) -> &str {
        match self {
            LinkedToken::Plain(value) | LinkedToken::Typed { value, .. } => value,
        }
    }

    pub fn kind(&self) -> Option<TokenType> {
        match self {
            LinkedToken::Plain(_) => None,
            LinkedToken::Typed { kind, .. } => Some(*kind),
        }
    }

    pub fn relation(&self) -> Option<Relation> {
        match self {
            LinkedToken::Plain(_) => None,
            LinkedToken::Typed { relation, .. } => Some(*relation),
        }
    }
}

impl From<&str> for LinkedToken {
    fn from(value: &str) -> Self {
        LinkedToken::Plain(value.to_string())
    }
}

impl From<String> for LinkedToken {
    fn from(value: String) -> Self {
        LinkedToken::Plain(value)
    }
}

impl fmt::Display for LinkedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkedToken::Plain(value) => f.write_str(value),
            LinkedToken::Typed {
                kind,
                relation,
                value,
            } => write!(f, "{kind:?}:{relation:?}:{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_tokens_serialize_as_strings() {
        let tokens: Vec<LinkedToken> = vec!["asd".into(), "qwe".into()];
        assert_eq!(serde_json::to_value(&tokens).unwrap(), json!(["asd", "qwe"]));
    }

    #[test]
    fn typed_tokens_use_wire_names() {
        let token = LinkedToken::parent_session("kq3x9a1");
        assert_eq!(
            serde_json::to_value(&token).unwrap(),
            json!({"Type": "LOGSESSION", "Relation": "PARENT", "Value": "kq3x9a1"})
        );
        assert_eq!(token.kind(), Some(TokenType::LogSession));
        assert_eq!(token.relation(), Some(Relation::Parent));
    }

    #[test]
    fn mixed_tokens_roundtrip() {
        let raw = json!(["asd", {"Type": "EXTERNAL", "Relation": "SIBLING", "Value": "req-9"}]);
        let tokens: Vec<LinkedToken> = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(tokens[0], LinkedToken::Plain("asd".into()));
        assert_eq!(tokens[1].value(), "req-9");
        assert_eq!(serde_json::to_value(&tokens).unwrap(), raw);
    }
}
