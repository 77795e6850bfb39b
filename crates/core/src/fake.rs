// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory engine for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::completion::Completion;
use crate::engine::{EngineFactory, LogEngine, LogRecord, LogSession, Sink};
use crate::error::LogError;
use crate::labels::{LabelSet, Props};
use crate::payload::Payload;
use crate::token::LinkedToken;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Recorded engine call
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    OpenSession {
        parent: Option<String>,
        props: Props,
    },
    OpenRecord {
        session: String,
        props: Props,
    },
    Write {
        record: String,
        data: Vec<u8>,
    },
    CloseRecord {
        record: String,
    },
    SetParent {
        session: String,
        parent: String,
    },
    AddLinkedToken {
        session: String,
        token: LinkedToken,
    },
    SetUserData {
        session: String,
        key: String,
        value: Value,
    },
    CloseSession {
        session: String,
    },
}

#[derive(Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    sessions: Vec<FakeSession>,
    fail_session_opens: usize,
    fail_record_opens: usize,
    logged: Vec<String>,
}

fn injected(what: &str) -> LogError {
    LogError::io(
        "opening",
        PathBuf::from(what),
        std::io::Error::other("injected failure"),
    )
}

/// Fake engine keeping everything in memory
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Every session opened so far
    pub fn sessions(&self) -> Vec<FakeSession> {
        self.lock().sessions.clone()
    }

    /// Fail the next `n` session opens
    pub fn fail_session_opens(&self, n: usize) {
        self.lock().fail_session_opens = n;
    }

    /// Fail the next `n` record opens
    pub fn fail_record_opens(&self, n: usize) {
        self.lock().fail_record_opens = n;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record_call(&self, call: EngineCall) {
        self.lock().calls.push(call);
    }
}

impl LogEngine for FakeEngine {
    type Session = FakeSession;

    fn open_session(&self, parent: Option<String>, labels: LabelSet) -> Completion<FakeSession> {
        let props = labels.into_props(Some(&Props::session_defaults()));
        let mut state = self.lock();
        state.calls.push(EngineCall::OpenSession {
            parent: parent.clone(),
            props: props.clone(),
        });
        if state.fail_session_opens > 0 {
            state.fail_session_opens -= 1;
            return Completion::err(injected("session"));
        }
        let index = state.sessions.len() as u64;
        let session = FakeSession {
            shared: Arc::new(SessionShared {
                id: format!("fake-{index}"),
                index,
                props,
                engine: self.clone(),
                state: Mutex::new(SessionState {
                    parent,
                    ..SessionState::default()
                }),
            }),
        };
        state.sessions.push(session.clone());
        Completion::ok(session)
    }

    fn open_sessions(&self) -> Vec<String> {
        self.lock()
            .sessions
            .iter()
            .filter(|s| !s.is_closed())
            .map(|s| s.shared.id.clone())
            .collect()
    }

    fn logged_sessions(&self) -> Vec<String> {
        self.lock().logged.clone()
    }

    fn storage_root(&self) -> Option<PathBuf> {
        None
    }

    fn wait(&self) -> Completion {
        Completion::ok(())
    }
}

#[derive(Default)]
struct SessionState {
    parent: Option<String>,
    records: Vec<FakeRecord>,
    tokens: Vec<LinkedToken>,
    user_data: Map<String, Value>,
    closed: bool,
}

struct SessionShared {
    id: String,
    index: u64,
    props: Props,
    engine: FakeEngine,
    state: Mutex<SessionState>,
}

/// Fake session recording everything it is asked to do
#[derive(Clone)]
pub struct FakeSession {
    shared: Arc<SessionShared>,
}

impl FakeSession {
    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every record opened on this session, in sequence order
    pub fn records(&self) -> Vec<FakeRecord> {
        self.lock().records.clone()
    }

    pub fn linked_tokens(&self) -> Vec<LinkedToken> {
        self.lock().tokens.clone()
    }

    pub fn user_data(&self) -> Map<String, Value> {
        self.lock().user_data.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl LogSession for FakeSession {
    type Record = FakeRecord;

    fn id(&self) -> Option<String> {
        Some(self.shared.id.clone())
    }

    fn index(&self) -> Option<u64> {
        Some(self.shared.index)
    }

    fn parent_id(&self) -> Option<String> {
        self.lock().parent.clone()
    }

    fn storage_path(&self) -> Option<PathBuf> {
        None
    }

    fn props(&self) -> Props {
        self.shared.props.clone()
    }

    fn open_record(&self, labels: LabelSet) -> Completion<FakeRecord> {
        let props = labels.into_props(Some(&Props::record_defaults()));
        let engine = &self.shared.engine;
        engine.record_call(EngineCall::OpenRecord {
            session: self.shared.id.clone(),
            props: props.clone(),
        });
        let mut state = self.lock();
        if state.closed {
            return Completion::err(LogError::SessionClosed(self.shared.id.clone()));
        }
        let sequence = state.records.len() as u64 + 1;
        {
            let mut engine_state = engine.lock();
            if engine_state.fail_record_opens > 0 {
                engine_state.fail_record_opens -= 1;
                return Completion::err(injected("record"));
            }
        }
        let record = FakeRecord {
            shared: Arc::new(RecordShared {
                id: format!("{}/{sequence}", self.shared.id),
                sequence,
                props,
                engine: engine.clone(),
                data: Mutex::new(RecordData::default()),
            }),
        };
        state.records.push(record.clone());
        Completion::ok(record)
    }

    fn write(&self, payload: Payload, labels: Option<LabelSet>) -> Completion {
        let props = payload.props(labels);
        let bytes = match payload.into_bytes(&props) {
            Ok(bytes) => bytes,
            Err(e) => return Completion::err(e.into()),
        };
        let mut opened = self.open_record(LabelSet::Props(props));
        match opened.try_take() {
            Some(Ok(record)) => {
                drop(record.write(bytes));
                record.close()
            }
            Some(Err(e)) => Completion::err(e),
            None => Completion::err(LogError::Abandoned),
        }
    }

    fn open_records(&self) -> Vec<String> {
        self.lock()
            .records
            .iter()
            .filter(|r| !r.is_closed())
            .map(|r| r.shared.id.clone())
            .collect()
    }

    fn logged_records(&self) -> Vec<Option<String>> {
        self.lock()
            .records
            .iter()
            .map(|r| r.is_closed().then(|| r.shared.id.clone()))
            .collect()
    }

    fn set_parent_session(&self, parent: String) -> Completion {
        self.shared.engine.record_call(EngineCall::SetParent {
            session: self.shared.id.clone(),
            parent: parent.clone(),
        });
        self.lock().parent = Some(parent);
        Completion::ok(())
    }

    fn add_linked_token(&self, token: LinkedToken) -> Completion {
        self.shared.engine.record_call(EngineCall::AddLinkedToken {
            session: self.shared.id.clone(),
            token: token.clone(),
        });
        self.lock().tokens.push(token);
        Completion::ok(())
    }

    fn set_user_data(&self, key: String, value: Value) -> Completion {
        self.shared.engine.record_call(EngineCall::SetUserData {
            session: self.shared.id.clone(),
            key: key.clone(),
            value: value.clone(),
        });
        self.lock().user_data.insert(key, value);
        Completion::ok(())
    }

    fn is_idle(&self) -> bool {
        true
    }

    fn wait(&self) -> Completion {
        Completion::ok(())
    }

    fn close(&self) -> Completion {
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        if first {
            let engine = &self.shared.engine;
            engine.record_call(EngineCall::CloseSession {
                session: self.shared.id.clone(),
            });
            engine.lock().logged.push(self.shared.id.clone());
        }
        Completion::ok(())
    }
}

#[derive(Default)]
struct RecordData {
    bytes: Vec<u8>,
    closed: bool,
}

struct RecordShared {
    id: String,
    sequence: u64,
    props: Props,
    engine: FakeEngine,
    data: Mutex<RecordData>,
}

/// Fake record collecting its bytes in memory
#[derive(Clone)]
pub struct FakeRecord {
    shared: Arc<RecordShared>,
}

impl FakeRecord {
    fn lock(&self) -> std::sync::MutexGuard<'_, RecordData> {
        self.shared.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn contents(&self) -> Vec<u8> {
        self.lock().bytes.clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Sink for FakeRecord {
    fn write(&self, data: Vec<u8>) -> Completion {
        let mut state = self.lock();
        if state.closed {
            return Completion::err(LogError::RecordClosed(self.shared.id.clone()));
        }
        self.shared.engine.record_call(EngineCall::Write {
            record: self.shared.id.clone(),
            data: data.clone(),
        });
        state.bytes.extend_from_slice(&data);
        Completion::ok(())
    }

    fn close(&self) -> Completion {
        let first = !std::mem::replace(&mut self.lock().closed, true);
        if first {
            self.shared.engine.record_call(EngineCall::CloseRecord {
                record: self.shared.id.clone(),
            });
        }
        Completion::ok(())
    }
}

impl LogRecord for FakeRecord {
    fn id(&self) -> Option<String> {
        Some(self.shared.id.clone())
    }

    fn sequence(&self) -> Option<u64> {
        Some(self.shared.sequence)
    }

    fn path(&self) -> Option<PathBuf> {
        None
    }

    fn props(&self) -> Props {
        self.shared.props.clone()
    }

    fn pending_writes(&self) -> usize {
        0
    }

    fn wait(&self) -> Completion {
        Completion::ok(())
    }
}

/// Factory handing out a shared [`FakeEngine`]
#[derive(Clone)]
pub struct FakeFactory {
    engine: FakeEngine,
    builds: Arc<AtomicUsize>,
    fail_builds: Arc<AtomicUsize>,
    gate: watch::Receiver<bool>,
}

/// Holds [`FakeFactory::build`] until opened
pub struct FactoryGate {
    tx: watch::Sender<bool>,
}

impl FactoryGate {
    pub fn open(&self) {
        let _ = self.tx.send(true);
    }
}

impl FakeFactory {
    pub fn new(engine: FakeEngine) -> Self {
        let (_tx, gate) = watch::channel(true);
        Self {
            engine,
            builds: Arc::new(AtomicUsize::new(0)),
            fail_builds: Arc::new(AtomicUsize::new(0)),
            gate,
        }
    }

    /// A factory whose builds wait until the returned gate opens
    pub fn gated(engine: FakeEngine) -> (Self, FactoryGate) {
        let (tx, gate) = watch::channel(false);
        let factory = Self {
            gate,
            ..Self::new(engine)
        };
        (factory, FactoryGate { tx })
    }

    /// Fail the next `n` builds
    pub fn fail_builds(&self, n: usize) {
        self.fail_builds.store(n, Ordering::SeqCst);
    }

    /// Builds attempted so far
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    async fn build(&self) -> Result<FakeEngine, LogError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.clone();
        // A dropped gate sender means the gate is open for good
        let _ = gate.wait_for(|open| *open).await;
        let failing = self
            .fail_builds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(injected("engine"));
        }
        Ok(self.engine.clone())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
