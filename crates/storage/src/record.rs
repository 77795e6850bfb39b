// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed record
//!
//! Each record owns a writer task fed over a channel, so writes reach the
//! file in the order they were submitted.

use crate::naming::record_file_name;
use crate::session::SessionInner;
use deferlog_core::{
    pair, when_fired, Completer, Completion, Lifecycle, Listeners, LogError, LogRecord, Props,
    Sink,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

enum RecordOp {
    Write(Vec<u8>, Completer),
    Close(Completer),
}

#[derive(Default)]
struct RecordState {
    pending: usize,
    closing: bool,
    closed: bool,
    listeners: Listeners,
}

struct RecordInner {
    id: String,
    sequence: u64,
    path: PathBuf,
    props: Props,
    tx: mpsc::UnboundedSender<RecordOp>,
    state: Arc<Mutex<RecordState>>,
}

/// An append-only file inside a session directory
#[derive(Clone)]
pub struct FileRecord {
    inner: Arc<RecordInner>,
}

impl FileRecord {
    /// Create the record file and start its writer
    pub(crate) async fn create(
        session: Weak<SessionInner>,
        dir: &Path,
        sequence: u64,
        props: Props,
    ) -> Result<Self, LogError> {
        let id = record_file_name(sequence, &props);
        let path = dir.join(&id);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await
            .map_err(|e| LogError::io("creating record", &path, e))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(RecordState::default()));
        tokio::spawn(run_writer(
            file,
            rx,
            Arc::clone(&state),
            session,
            sequence,
            id.clone(),
        ));
        tracing::debug!(record = %id, "record opened");

        Ok(Self {
            inner: Arc::new(RecordInner {
                id,
                sequence,
                path,
                props,
                tx,
                state,
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn submit(&self, op: RecordOp) {
        if let Err(mpsc::error::SendError(op)) = self.inner.tx.send(op) {
            let done = match op {
                RecordOp::Write(_, done) | RecordOp::Close(done) => done,
            };
            done.complete(Err(LogError::Abandoned));
        }
    }
}

impl Sink for FileRecord {
    fn write(&self, data: Vec<u8>) -> Completion {
        let (done, completion) = pair();
        {
            let mut state = self.lock();
            if state.closing {
                return Completion::err(LogError::RecordClosed(self.inner.id.clone()));
            }
            state.pending += 1;
        }
        self.submit(RecordOp::Write(data, done));
        completion
    }

    fn close(&self) -> Completion {
        let (done, completion) = pair();
        {
            let mut state = self.lock();
            if state.closed {
                return Completion::ok(());
            }
            if state.closing {
                return when_fired(state.listeners.listen(Lifecycle::Closed));
            }
            state.closing = true;
        }
        self.submit(RecordOp::Close(done));
        completion
    }
}

impl LogRecord for FileRecord {
    fn id(&self) -> Option<String> {
        Some(self.inner.id.clone())
    }

    fn sequence(&self) -> Option<u64> {
        Some(self.inner.sequence)
    }

    fn path(&self) -> Option<PathBuf> {
        Some(self.inner.path.clone())
    }

    fn props(&self) -> Props {
        self.inner.props.clone()
    }

    fn pending_writes(&self) -> usize {
        self.lock().pending
    }

    fn wait(&self) -> Completion {
        let mut state = self.lock();
        if state.pending == 0 {
            return Completion::ok(());
        }
        when_fired(state.listeners.listen(Lifecycle::Idle))
    }
}

async fn run_writer(
    mut file: File,
    mut rx: mpsc::UnboundedReceiver<RecordOp>,
    state: Arc<Mutex<RecordState>>,
    session: Weak<SessionInner>,
    sequence: u64,
    id: String,
) {
    while let Some(op) = rx.recv().await {
        match op {
            RecordOp::Write(data, done) => {
                let result = file.write_all(&data).await;
                {
                    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                    state.pending = state.pending.saturating_sub(1);
                    if state.pending == 0 {
                        state.listeners.notify(Lifecycle::Idle);
                    }
                }
                if let Err(e) = &result {
                    tracing::warn!(record = %id, error = %e, "record write failed");
                }
                done.complete(result.map_err(|e| LogError::io("writing record", &id, e)));
            }
            RecordOp::Close(done) => {
                let result = file.flush().await;
                drop(file);
                state
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .closed = true;
                if let Some(session) = session.upgrade() {
                    session.record_closed(sequence, &id);
                }
                state
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .listeners
                    .notify(Lifecycle::Closed);
                tracing::debug!(record = %id, "record closed");
                done.complete(result.map_err(|e| LogError::io("closing record", &id, e)));
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
