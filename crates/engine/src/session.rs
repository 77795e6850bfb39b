// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred session: hands out deferred records and opens a real session
//! only when one of them is allowed to materialize

use crate::calls::SessionCall;
use crate::log::LogShared;
use crate::record::{DeferredRecord, RecordShared};
use deferlog_core::{
    pair, CallBuffer, Completion, FlushArbiter, LabelSet, Lifecycle, LinkedToken, Listeners,
    LogEngine, LogError, LogSession, Payload, Props, Sink, LINKED_TOKENS_KEY, USER_DATA_KEY,
};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::Instrument;

pub(crate) struct SessionState<E: LogEngine> {
    real: Option<E::Session>,
    materializing: bool,
    /// A flush was forced; records materialize even when empty
    forced: bool,
    parent: Option<String>,
    tokens: Vec<LinkedToken>,
    user_data: Map<String, Value>,
    /// Calls waiting for the real session, replayed in order
    calls: CallBuffer<SessionCall>,
    /// Records still waiting on this session
    records: Vec<Arc<RecordShared<E>>>,
    arbiter: FlushArbiter,
    closed_locally: bool,
    listeners: Listeners,
}

impl<E: LogEngine> SessionState<E> {
    /// Props for the real session, carrying everything recorded so far
    fn merged_props(&self, props: &Props) -> Props {
        let mut merged = props.clone();
        if !self.tokens.is_empty() {
            let tokens = self
                .tokens
                .iter()
                .filter_map(|t| serde_json::to_value(t).ok())
                .collect();
            merged
                .extra
                .insert(LINKED_TOKENS_KEY.to_string(), Value::Array(tokens));
        }
        if !self.user_data.is_empty() {
            merged.extra.insert(
                USER_DATA_KEY.to_string(),
                Value::Object(self.user_data.clone()),
            );
        }
        merged
    }

    /// Let go of records that are settled, or dropped while still empty
    fn prune(&mut self) {
        self.records
            .retain(|r| !r.is_settled() && (Arc::strong_count(r) > 1 || !r.is_empty()));
    }

    fn live_records(&mut self) -> Vec<Arc<RecordShared<E>>> {
        self.prune();
        self.records.clone()
    }

    /// Calls go straight to the real session only once nothing is queued
    fn direct(&self) -> Option<E::Session> {
        if self.calls.is_empty() {
            self.real.clone()
        } else {
            None
        }
    }
}

pub(crate) struct SessionShared<E: LogEngine> {
    props: Props,
    log: Arc<LogShared<E>>,
    state: Mutex<SessionState<E>>,
}

impl<E: LogEngine> SessionShared<E> {
    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState<E>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn arbiter(&self) -> FlushArbiter {
        self.lock().arbiter.clone()
    }

    pub(crate) fn real(&self) -> Option<E::Session> {
        self.lock().real.clone()
    }

    /// No child record holds anything
    pub(crate) fn is_empty(&self) -> bool {
        let records = self.lock().live_records();
        records.iter().all(|r| r.is_empty())
    }

    /// A child got its real record
    pub(crate) fn record_settled(&self) {
        self.lock().prune();
    }

    /// A child wants to materialize; cascade to the log if needed
    pub(crate) fn request_materialization(self: &Arc<Self>, force: bool) {
        {
            let mut state = self.lock();
            if force {
                state.forced = true;
            }
            if state.real.is_some() || state.materializing || state.closed_locally {
                return;
            }
        }
        match self.log.real() {
            Some(engine) => self.materialize(engine),
            None => self.log.request_materialization(Arc::downgrade(self)),
        }
    }

    /// The log now has a real engine
    pub(crate) fn log_materialized(self: &Arc<Self>, engine: E) {
        self.materialize(engine);
    }

    fn materialize(self: &Arc<Self>, engine: E) {
        let (parent, props) = {
            let mut state = self.lock();
            if state.real.is_some() || state.materializing {
                return;
            }
            if state.closed_locally {
                tracing::debug!("session closed before the engine was ready");
                return;
            }
            state.materializing = true;
            (state.parent.clone(), state.merged_props(&self.props))
        };
        let opened = engine.open_session(parent, LabelSet::Props(props));
        let session = Arc::clone(self);
        let span = tracing::info_span!("session.materialize");
        tokio::spawn(
            async move {
                match opened.await {
                    Ok(real) => {
                        tracing::info!(id = ?real.id(), "session materialized");
                        session.attach(real);
                    }
                    Err(e) => {
                        // Stay buffered; the next write tries again
                        session.lock().materializing = false;
                        tracing::warn!(error = %e, "session open failed");
                    }
                }
            }
            .instrument(span),
        );
    }

    /// Adopt the real session: assign records, then replay queued calls
    fn attach(&self, real: E::Session) {
        let (records, forced) = {
            let mut state = self.lock();
            state.real = Some(real.clone());
            state.materializing = false;
            state.listeners.notify(Lifecycle::Materialized);
            (state.live_records(), state.forced)
        };
        for record in records {
            DeferredRecord::from_shared(record).try_materialize(forced);
        }
        let mut state = self.lock();
        let replayed = state.calls.flush(&real);
        tracing::trace!(replayed, "session calls replayed");
    }
}

/// A session that exists only in memory until a record needs storage
pub struct DeferredSession<E: LogEngine> {
    shared: Arc<SessionShared<E>>,
}

impl<E: LogEngine> Clone for DeferredSession<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: LogEngine> DeferredSession<E> {
    pub(crate) fn new(
        log: Arc<LogShared<E>>,
        parent: Option<String>,
        labels: LabelSet,
        arbiter: FlushArbiter,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                props: labels.into_props(Some(&Props::session_defaults())),
                log,
                state: Mutex::new(SessionState {
                    real: None,
                    materializing: false,
                    forced: false,
                    parent,
                    tokens: Vec::new(),
                    user_data: Map::new(),
                    calls: CallBuffer::new(),
                    records: Vec::new(),
                    arbiter,
                    closed_locally: false,
                    listeners: Listeners::new(),
                }),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<SessionShared<E>> {
        &self.shared
    }

    pub(crate) fn from_shared(shared: Arc<SessionShared<E>>) -> Self {
        Self { shared }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState<E>> {
        self.shared.lock()
    }

    /// The real session, once materialized
    pub fn real(&self) -> Option<E::Session> {
        self.shared.real()
    }

    /// A deferred record, usable right away
    pub fn record(&self, labels: impl Into<LabelSet>) -> DeferredRecord<E> {
        let record = DeferredRecord::new(Arc::clone(&self.shared), labels.into());
        let mut state = self.lock();
        state.prune();
        state.records.push(Arc::clone(record.shared()));
        record
    }

    /// Nothing has been written to any record of this session
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// Replace the arbiter and let every buffered record reconsider
    pub fn set_flush_arbiter(&self, arbiter: FlushArbiter) {
        let records = {
            let mut state = self.lock();
            state.arbiter = arbiter;
            state.live_records()
        };
        for record in records {
            DeferredRecord::from_shared(record).try_materialize(false);
        }
    }

    /// Materialize every buffered record now, whatever the arbiter says
    pub fn flush(&self) {
        let records = {
            let mut state = self.lock();
            state.forced = true;
            state.live_records()
        };
        for record in records {
            DeferredRecord::from_shared(record).try_materialize(true);
        }
    }

    /// Queue `call` unless it can go to the real session now
    fn meta_call(
        &self,
        call: impl FnOnce(&E::Session) -> Completion,
        record: impl FnOnce(&mut SessionState<E>),
        queue: impl FnOnce(deferlog_core::Completer) -> SessionCall,
    ) -> Completion {
        let mut state = self.lock();
        if let Some(real) = state.direct() {
            drop(state);
            return call(&real);
        }
        if state.real.is_some() || state.materializing {
            let (done, completion) = pair();
            state.calls.push(queue(done));
            return completion;
        }
        record(&mut *state);
        Completion::ok(())
    }

    /// Resolve `then(real)` once materialized
    fn after_materialized(
        &self,
        then: impl FnOnce(E::Session) -> Completion + Send + 'static,
    ) -> Completion {
        let signal = {
            let mut state = self.lock();
            if let Some(real) = &state.real {
                return then(real.clone());
            }
            state.listeners.listen(Lifecycle::Materialized)
        };
        let session = self.clone();
        let (done, completion) = pair();
        tokio::spawn(async move {
            if signal.await.is_err() {
                done.complete(Err(LogError::Abandoned));
                return;
            }
            match session.real() {
                Some(real) => done.follow(then(real)),
                None => done.complete(Err(LogError::Abandoned)),
            }
        });
        completion
    }
}

impl<E: LogEngine> LogSession for DeferredSession<E> {
    type Record = DeferredRecord<E>;

    fn id(&self) -> Option<String> {
        self.real().and_then(|s| s.id())
    }

    fn index(&self) -> Option<u64> {
        self.real().and_then(|s| s.index())
    }

    fn parent_id(&self) -> Option<String> {
        match self.real() {
            Some(real) => real.parent_id(),
            None => self.lock().parent.clone(),
        }
    }

    fn storage_path(&self) -> Option<PathBuf> {
        self.real().and_then(|s| s.storage_path())
    }

    fn props(&self) -> Props {
        self.shared.props.clone()
    }

    fn open_record(&self, labels: LabelSet) -> Completion<DeferredRecord<E>> {
        Completion::ok(self.record(labels))
    }

    fn write(&self, payload: Payload, labels: Option<LabelSet>) -> Completion {
        let props = payload.props(labels);
        let bytes = match payload.into_bytes(&props) {
            Ok(bytes) => bytes,
            Err(e) => return Completion::err(e.into()),
        };
        let record = self.record(LabelSet::Props(props));
        let written = record.write(bytes);
        let closed = record.close();
        let (done, completion) = pair();
        tokio::spawn(async move {
            let result = async {
                written.await?;
                closed.await
            }
            .await;
            done.complete(result);
        });
        completion
    }

    fn open_records(&self) -> Vec<String> {
        self.real().map(|s| s.open_records()).unwrap_or_default()
    }

    fn logged_records(&self) -> Vec<Option<String>> {
        self.real().map(|s| s.logged_records()).unwrap_or_default()
    }

    fn set_parent_session(&self, parent: String) -> Completion {
        let queued = parent.clone();
        let recorded = parent.clone();
        self.meta_call(
            move |real| real.set_parent_session(parent),
            move |state| state.parent = Some(recorded),
            move |done| SessionCall::SetParent(queued, done),
        )
    }

    fn add_linked_token(&self, token: LinkedToken) -> Completion {
        let queued = token.clone();
        let recorded = token.clone();
        self.meta_call(
            move |real| real.add_linked_token(token),
            move |state| state.tokens.push(recorded),
            move |done| SessionCall::AddLinkedToken(queued, done),
        )
    }

    fn set_user_data(&self, key: String, value: Value) -> Completion {
        let (queued_key, queued_value) = (key.clone(), value.clone());
        let (recorded_key, recorded_value) = (key.clone(), value.clone());
        self.meta_call(
            move |real| real.set_user_data(key, value),
            move |state| {
                state.user_data.insert(recorded_key, recorded_value);
            },
            move |done| SessionCall::SetUserData(queued_key, queued_value, done),
        )
    }

    fn is_idle(&self) -> bool {
        match self.real() {
            Some(real) => real.is_idle(),
            None => self.is_empty(),
        }
    }

    fn wait(&self) -> Completion {
        if self.real().is_none() && self.is_empty() {
            return Completion::ok(());
        }
        self.after_materialized(|real| real.wait())
    }

    fn close(&self) -> Completion {
        let empty = self.is_empty();
        let mut state = self.lock();
        if let Some(real) = state.direct() {
            drop(state);
            return real.close();
        }
        if state.real.is_some() || state.materializing || !empty {
            // Close once the real session exists and the records reached it
            let (done, completion) = pair();
            state.calls.push(SessionCall::Close(done));
            return completion;
        }
        if !state.closed_locally {
            state.closed_locally = true;
            state.listeners.notify(Lifecycle::Closed);
            tracing::debug!("session closed without materializing");
        }
        Completion::ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
