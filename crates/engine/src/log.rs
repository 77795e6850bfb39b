// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred log: builds its engine only when a session needs one

use crate::session::{DeferredSession, SessionShared};
use deferlog_core::{
    pair, Completion, EngineFactory, FlushArbiter, LabelSet, Lifecycle, Listeners, LogEngine,
    LogError,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};
use tracing::Instrument;

struct LogState<E: LogEngine> {
    real: Option<E>,
    building: bool,
    /// Sessions that asked for materialization before the engine existed
    waiting: Vec<Weak<SessionShared<E>>>,
    sessions: Vec<Weak<SessionShared<E>>>,
    arbiter: FlushArbiter,
    listeners: Listeners,
}

pub(crate) struct LogShared<E: LogEngine> {
    factory: Box<dyn EngineFactory<Engine = E>>,
    state: Mutex<LogState<E>>,
}

impl<E: LogEngine> LogShared<E> {
    fn lock(&self) -> std::sync::MutexGuard<'_, LogState<E>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn real(&self) -> Option<E> {
        self.lock().real.clone()
    }

    fn live_sessions(&self) -> Vec<Arc<SessionShared<E>>> {
        self.lock().sessions.iter().filter_map(Weak::upgrade).collect()
    }

    /// A session needs the engine; build it once
    pub(crate) fn request_materialization(self: &Arc<Self>, session: Weak<SessionShared<E>>) {
        let mut state = self.lock();
        if let Some(engine) = state.real.clone() {
            drop(state);
            if let Some(session) = session.upgrade() {
                session.log_materialized(engine);
            }
            return;
        }
        if !state.waiting.iter().any(|w| w.ptr_eq(&session)) {
            state.waiting.push(session);
        }
        if state.building {
            return;
        }
        state.building = true;
        drop(state);

        let log = Arc::clone(self);
        let span = tracing::info_span!("log.materialize");
        tokio::spawn(
            async move {
                match log.factory.build().await {
                    Ok(engine) => log.attach(engine),
                    Err(e) => {
                        // Keep the waiting sessions; the next request retries
                        log.lock().building = false;
                        tracing::warn!(error = %e, "engine build failed");
                    }
                }
            }
            .instrument(span),
        );
    }

    fn attach(&self, engine: E) {
        let waiting = {
            let mut state = self.lock();
            state.real = Some(engine.clone());
            state.building = false;
            state.listeners.notify(Lifecycle::Materialized);
            std::mem::take(&mut state.waiting)
        };
        tracing::info!(root = ?engine.storage_root(), "log materialized");
        for session in waiting.iter().filter_map(Weak::upgrade) {
            session.log_materialized(engine.clone());
        }
    }
}

/// A log whose backing engine is built on first need
pub struct DeferredLog<E: LogEngine> {
    shared: Arc<LogShared<E>>,
}

impl<E: LogEngine> Clone for DeferredLog<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: LogEngine> DeferredLog<E> {
    pub fn new(factory: impl EngineFactory<Engine = E>) -> Self {
        Self::with_arbiter(factory, FlushArbiter::default())
    }

    /// `arbiter` becomes the default of every session opened afterwards
    pub fn with_arbiter(factory: impl EngineFactory<Engine = E>, arbiter: FlushArbiter) -> Self {
        Self {
            shared: Arc::new(LogShared {
                factory: Box::new(factory),
                state: Mutex::new(LogState {
                    real: None,
                    building: false,
                    waiting: Vec::new(),
                    sessions: Vec::new(),
                    arbiter,
                    listeners: Listeners::new(),
                }),
            }),
        }
    }

    /// The engine, once built
    pub fn real(&self) -> Option<E> {
        self.shared.real()
    }

    /// A deferred session, usable right away
    pub fn session(&self, parent: Option<String>, labels: impl Into<LabelSet>) -> DeferredSession<E> {
        let arbiter = self.shared.lock().arbiter.clone();
        let session = DeferredSession::new(Arc::clone(&self.shared), parent, labels.into(), arbiter);
        let mut state = self.shared.lock();
        state.sessions.retain(|s| s.strong_count() > 0);
        state.sessions.push(Arc::downgrade(session.shared()));
        session
    }

    /// Replace the arbiter of this log and of every live session
    pub fn set_flush_arbiter(&self, arbiter: FlushArbiter) {
        self.shared.lock().arbiter = arbiter.clone();
        for session in self.shared.live_sessions() {
            DeferredSession::from_shared(session).set_flush_arbiter(arbiter.clone());
        }
    }

    /// Force every live session to materialize its buffered records
    pub fn flush(&self) {
        for session in self.shared.live_sessions() {
            DeferredSession::from_shared(session).flush();
        }
    }

    /// No session holds buffered or materialized data
    pub fn is_empty(&self) -> bool {
        self.shared.live_sessions().iter().all(|s| s.is_empty())
    }
}

impl<E: LogEngine> LogEngine for DeferredLog<E> {
    type Session = DeferredSession<E>;

    fn open_session(&self, parent: Option<String>, labels: LabelSet) -> Completion<DeferredSession<E>> {
        Completion::ok(self.session(parent, labels))
    }

    fn open_sessions(&self) -> Vec<String> {
        self.real().map(|e| e.open_sessions()).unwrap_or_default()
    }

    fn logged_sessions(&self) -> Vec<String> {
        self.real().map(|e| e.logged_sessions()).unwrap_or_default()
    }

    fn storage_root(&self) -> Option<PathBuf> {
        self.real().and_then(|e| e.storage_root())
    }

    fn wait(&self) -> Completion {
        if let Some(real) = self.real() {
            return real.wait();
        }
        if self.is_empty() {
            return Completion::ok(());
        }
        // Check and register under one lock
        let signal = {
            let mut state = self.shared.lock();
            let real = state.real.clone();
            match real {
                Some(real) => {
                    drop(state);
                    return real.wait();
                }
                None => state.listeners.listen(Lifecycle::Materialized),
            }
        };
        let log = self.clone();
        let (done, completion) = pair();
        tokio::spawn(async move {
            if signal.await.is_err() {
                done.complete(Err(LogError::Abandoned));
                return;
            }
            match log.real() {
                Some(real) => done.follow(real.wait()),
                None => done.complete(Err(LogError::Abandoned)),
            }
        });
        completion
    }
}

impl<E: LogEngine> std::fmt::Debug for DeferredLog<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("DeferredLog")
            .field("materialized", &state.real.is_some())
            .field("building", &state.building)
            .field("sessions", &state.sessions.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
