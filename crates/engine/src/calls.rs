// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calls buffered by deferred records and sessions

use deferlog_core::{Completer, LinkedToken, LogError, LogSession, Replay, Sink};
use serde_json::Value;

/// A record operation waiting for a real record
pub(crate) enum RecordCall {
    Write(Vec<u8>, Completer),
    Close(Completer),
}

impl RecordCall {
    pub(crate) fn is_write(&self) -> bool {
        matches!(self, RecordCall::Write(..))
    }

    /// Resolve without a target
    pub(crate) fn fail(self, error: LogError) {
        match self {
            RecordCall::Write(_, done) | RecordCall::Close(done) => done.complete(Err(error)),
        }
    }
}

impl<R: Sink + ?Sized> Replay<R> for RecordCall {
    fn replay(self, target: &R) {
        match self {
            RecordCall::Write(data, done) => done.follow(target.write(data)),
            RecordCall::Close(done) => done.follow(target.close()),
        }
    }
}

/// A session operation that arrived while the real session was opening
pub(crate) enum SessionCall {
    SetParent(String, Completer),
    AddLinkedToken(LinkedToken, Completer),
    SetUserData(String, Value, Completer),
    Close(Completer),
}

impl<S: LogSession> Replay<S> for SessionCall {
    fn replay(self, target: &S) {
        match self {
            SessionCall::SetParent(parent, done) => done.follow(target.set_parent_session(parent)),
            SessionCall::AddLinkedToken(token, done) => done.follow(target.add_linked_token(token)),
            SessionCall::SetUserData(key, value, done) => {
                done.follow(target.set_user_data(key, value))
            }
            SessionCall::Close(done) => done.follow(target.close()),
        }
    }
}
