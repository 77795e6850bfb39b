// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred record: buffers writes until its session can open a real record

use crate::calls::RecordCall;
use crate::session::SessionShared;
use deferlog_core::{
    pair, CallBuffer, Completion, LabelSet, Lifecycle, Listeners, LogEngine, LogError,
    LogRecord, LogSession, Props, RecordOf, Sink,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Instrument;

/// Opens retried for a closing record before its buffer is failed
const CLOSE_RETRY_LIMIT: u32 = 3;
const CLOSE_RETRY_DELAY: Duration = Duration::from_millis(20);

pub(crate) struct RecordState<E: LogEngine> {
    real: Option<RecordOf<E>>,
    calls: CallBuffer<RecordCall>,
    /// A real record is being opened
    assigning: bool,
    /// Close was requested; later writes are refused
    closing: bool,
    /// Closed without ever materializing
    closed_locally: bool,
    failed_opens: u32,
    listeners: Listeners,
}

pub(crate) struct RecordShared<E: LogEngine> {
    props: Props,
    session: Arc<SessionShared<E>>,
    state: Mutex<RecordState<E>>,
}

impl<E: LogEngine> RecordShared<E> {
    fn lock(&self) -> std::sync::MutexGuard<'_, RecordState<E>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Nothing was ever written and no real record exists
    pub(crate) fn is_empty(&self) -> bool {
        let state = self.lock();
        state.real.is_none() && state.calls.is_empty()
    }

    /// Materialized, or closed without ever needing storage
    pub(crate) fn is_settled(&self) -> bool {
        let state = self.lock();
        state.real.is_some() || state.closed_locally
    }
}

/// A record that exists only in memory until materialization is allowed
pub struct DeferredRecord<E: LogEngine> {
    shared: Arc<RecordShared<E>>,
}

impl<E: LogEngine> Clone for DeferredRecord<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: LogEngine> DeferredRecord<E> {
    pub(crate) fn new(session: Arc<SessionShared<E>>, labels: LabelSet) -> Self {
        Self {
            shared: Arc::new(RecordShared {
                props: labels.into_props(Some(&Props::record_defaults())),
                session,
                state: Mutex::new(RecordState {
                    real: None,
                    calls: CallBuffer::new(),
                    assigning: false,
                    closing: false,
                    closed_locally: false,
                    failed_opens: 0,
                    listeners: Listeners::new(),
                }),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<RecordShared<E>> {
        &self.shared
    }

    pub(crate) fn from_shared(shared: Arc<RecordShared<E>>) -> Self {
        Self { shared }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordState<E>> {
        self.shared.lock()
    }

    /// The real record, once materialized
    pub fn real(&self) -> Option<RecordOf<E>> {
        self.lock().real.clone()
    }

    /// Nothing was ever written and no real record exists
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// No calls are waiting for a real record
    pub fn is_flushed(&self) -> bool {
        self.lock().calls.is_flushed()
    }

    fn describe(&self) -> String {
        match &self.shared.props.name {
            Some(name) => format!("deferred record {name}"),
            None => "deferred record".to_string(),
        }
    }

    /// Queue `data` ahead of everything already buffered
    ///
    /// Once the record is real this is an ordinary write.
    pub fn write_first(&self, data: Vec<u8>) -> Completion {
        let (done, completion) = pair();
        {
            let mut state = self.lock();
            if let Some(real) = &state.real {
                return real.write(data);
            }
            if state.closing {
                return Completion::err(LogError::RecordClosed(self.describe()));
            }
            state.calls.unshift(RecordCall::Write(data, done));
        }
        self.try_materialize(false);
        completion
    }

    /// Consider opening a real record
    ///
    /// Skipped when already real, an assignment is in flight, or nothing
    /// is buffered. Without `force` the session's arbiter has the last word.
    pub(crate) fn try_materialize(&self, force: bool) {
        {
            let state = self.lock();
            if state.real.is_some() || state.assigning || state.closed_locally {
                return;
            }
            if state.calls.is_empty() && !force {
                return;
            }
        }
        let session = &self.shared.session;
        if !force && !session.arbiter().should_flush(&self.shared.props) {
            tracing::trace!(record = %self.describe(), "arbiter declined");
            return;
        }
        match session.real() {
            Some(real) => self.assign(real),
            None => session.request_materialization(force),
        }
    }

    /// Open a real record on `session` and replay the buffer into it
    fn assign(&self, session: <E as LogEngine>::Session) {
        {
            let mut state = self.lock();
            if state.real.is_some() {
                tracing::error!(record = %self.describe(), "record already materialized");
                return;
            }
            if state.assigning {
                return;
            }
            state.assigning = true;
        }
        let opened = session.open_record(LabelSet::Props(self.shared.props.clone()));
        let record = self.clone();
        let span = tracing::debug_span!("record.assign", record = %self.describe());
        tokio::spawn(
            async move {
                match opened.await {
                    Ok(real) => {
                        {
                            let mut state = record.lock();
                            let replayed = state.calls.flush(&real);
                            state.real = Some(real);
                            state.assigning = false;
                            state.listeners.notify(Lifecycle::Materialized);
                            tracing::trace!(replayed, "record materialized");
                        }
                        record.shared.session.record_settled();
                    }
                    Err(e) => {
                        let (closing, failed_opens) = {
                            let mut state = record.lock();
                            state.assigning = false;
                            state.failed_opens += 1;
                            (state.closing, state.failed_opens)
                        };
                        tracing::warn!(error = %e, failed_opens, "record open failed");
                        // Stay buffered; the next write tries again. A closing
                        // record gets no more writes, so retry here.
                        if closing {
                            record.retry_closing(failed_opens, e);
                        }
                    }
                }
            }
            .instrument(span),
        );
    }

    /// Reopen a closing record after a delay, or fail its buffer for good
    fn retry_closing(&self, failed_opens: u32, error: LogError) {
        if failed_opens >= CLOSE_RETRY_LIMIT {
            self.abandon(failed_opens, &error);
            return;
        }
        let record = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(CLOSE_RETRY_DELAY * failed_opens).await;
            record.try_materialize(true);
        });
    }

    /// Settle without storage, resolving every buffered call with an error
    fn abandon(&self, attempts: u32, error: &LogError) {
        let calls = {
            let mut state = self.lock();
            if state.real.is_some() {
                return;
            }
            state.closed_locally = true;
            state.listeners.notify(Lifecycle::Materialized);
            state.listeners.notify(Lifecycle::Closed);
            state.calls.drain()
        };
        tracing::error!(record = %self.describe(), attempts, "record abandoned");
        for call in calls {
            call.fail(LogError::OpenFailed {
                id: self.describe(),
                attempts,
                reason: error.to_string(),
            });
        }
        self.shared.session.record_settled();
    }

    /// Resolve `then(real)` once materialized
    fn after_materialized(
        &self,
        then: impl FnOnce(RecordOf<E>) -> Completion + Send + 'static,
    ) -> Completion {
        let signal = {
            let mut state = self.lock();
            if let Some(real) = &state.real {
                return then(real.clone());
            }
            state.listeners.listen(Lifecycle::Materialized)
        };
        let record = self.clone();
        let (done, completion) = pair();
        tokio::spawn(async move {
            if signal.await.is_err() {
                done.complete(Err(LogError::Abandoned));
                return;
            }
            match record.real() {
                Some(real) => done.follow(then(real)),
                None => done.complete(Err(LogError::Abandoned)),
            }
        });
        completion
    }
}

impl<E: LogEngine> Sink for DeferredRecord<E> {
    fn write(&self, data: Vec<u8>) -> Completion {
        let (done, completion) = pair();
        {
            let mut state = self.lock();
            if let Some(real) = &state.real {
                return real.write(data);
            }
            if state.closing {
                return Completion::err(LogError::RecordClosed(self.describe()));
            }
            state.calls.push(RecordCall::Write(data, done));
        }
        self.try_materialize(false);
        completion
    }

    fn close(&self) -> Completion {
        let (done, completion) = pair();
        {
            let mut state = self.lock();
            if let Some(real) = &state.real {
                return real.close();
            }
            state.closing = true;
            if state.calls.is_empty() && !state.assigning {
                // Nothing to flush: close without touching storage
                state.closed_locally = true;
                state.listeners.notify(Lifecycle::Closed);
                return Completion::ok(());
            }
            state.calls.push(RecordCall::Close(done));
        }
        self.try_materialize(false);
        completion
    }
}

impl<E: LogEngine> LogRecord for DeferredRecord<E> {
    fn id(&self) -> Option<String> {
        self.real().and_then(|r| r.id())
    }

    fn sequence(&self) -> Option<u64> {
        self.real().and_then(|r| r.sequence())
    }

    fn path(&self) -> Option<PathBuf> {
        self.real().and_then(|r| r.path())
    }

    fn props(&self) -> Props {
        self.shared.props.clone()
    }

    fn pending_writes(&self) -> usize {
        let state = self.lock();
        match &state.real {
            Some(real) => real.pending_writes(),
            None => state.calls.iter().filter(|c| c.is_write()).count(),
        }
    }

    fn wait(&self) -> Completion {
        {
            let state = self.lock();
            if state.real.is_none() && state.calls.is_empty() {
                return Completion::ok(());
            }
        }
        self.after_materialized(|real| real.wait())
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
