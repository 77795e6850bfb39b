// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed session: a directory of numbered records
//!
//! Record 1 is the JSON meta record. Record numbers are taken when a
//! record is requested, so a record that fails to open leaves a hole in
//! [`LogSession::logged_records`] but never a reused number.

use crate::log::LogInner;
use crate::meta::{CloseMeta, SessionMeta};
use crate::naming::record_file_name;
use crate::record::FileRecord;
use deferlog_core::{
    pair, when_fired, Clock, Completion, DataType, LabelSet, Lifecycle, LinkedToken, Listeners,
    LogError, LogRecord, LogSession, Payload, Props, RecordType, Sink,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::OnceCell;

const META_SEQUENCE: u64 = 1;

struct SessionState {
    /// Last record number handed out
    counter: u64,
    /// Records requested but not yet open
    opening: usize,
    open: BTreeMap<u64, FileRecord>,
    logged: Vec<Option<String>>,
    meta: SessionMeta,
    meta_pending: usize,
    closing: bool,
    listeners: Listeners,
}

impl SessionState {
    fn is_idle(&self) -> bool {
        self.opening == 0 && self.open.is_empty() && self.meta_pending == 0
    }

    fn log_record(&mut self, sequence: u64, id: &str) {
        let index = sequence.saturating_sub(1) as usize;
        if self.logged.len() <= index {
            self.logged.resize(index + 1, None);
        }
        self.logged[index] = Some(id.to_string());
    }

    fn settle(&mut self) {
        if self.is_idle() {
            self.listeners.notify(Lifecycle::Idle);
        }
    }
}

pub(crate) struct SessionInner {
    id: String,
    index: u64,
    dir: PathBuf,
    props: Props,
    clock: Arc<dyn Clock>,
    log: Weak<LogInner>,
    state: Mutex<SessionState>,
    /// Serializes meta rewrites
    meta_lock: tokio::sync::Mutex<()>,
    closed: OnceCell<Result<(), String>>,
}

impl SessionInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A record finished closing
    pub(crate) fn record_closed(&self, sequence: u64, id: &str) {
        let mut state = self.lock();
        state.open.remove(&sequence);
        state.log_record(sequence, id);
        state.settle();
    }
}

/// A session stored as a directory under the log root
#[derive(Clone)]
pub struct FileSession {
    inner: Arc<SessionInner>,
}

impl FileSession {
    /// Write the meta record into an already allocated `dir`
    pub(crate) async fn create(
        log: Weak<LogInner>,
        id: String,
        index: u64,
        dir: PathBuf,
        parent: Option<String>,
        props: Props,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LogError> {
        let meta = SessionMeta::new(&id, parent, &props, clock.timestamp())?;
        let meta_name = meta_file_name();
        let path = dir.join(&meta_name);
        tokio::fs::write(&path, meta.to_json()?)
            .await
            .map_err(|e| LogError::io("writing meta record", &path, e))?;

        Ok(Self {
            inner: Arc::new(SessionInner {
                id,
                index,
                dir,
                props,
                clock,
                log,
                state: Mutex::new(SessionState {
                    counter: META_SEQUENCE,
                    opening: 0,
                    open: BTreeMap::new(),
                    logged: vec![Some(meta_name)],
                    meta,
                    meta_pending: 0,
                    closing: false,
                    listeners: Listeners::new(),
                }),
                meta_lock: tokio::sync::Mutex::new(()),
                closed: OnceCell::new(),
            }),
        })
    }

    /// In-memory meta as last submitted
    pub fn meta(&self) -> SessionMeta {
        self.inner.lock().meta.clone()
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.initialized()
    }

    /// Apply `change` to the meta and rewrite the meta record
    fn update_meta(&self, change: impl FnOnce(&mut SessionMeta)) -> Completion {
        {
            let mut state = self.inner.lock();
            if state.closing {
                return Completion::err(LogError::SessionClosed(self.inner.id.clone()));
            }
            change(&mut state.meta);
            state.meta_pending += 1;
        }
        let (done, completion) = pair();
        let session = self.clone();
        tokio::spawn(async move {
            let result = session.rewrite_meta().await;
            {
                let mut state = session.inner.lock();
                state.meta_pending -= 1;
                state.settle();
            }
            done.complete(result);
        });
        completion
    }

    async fn rewrite_meta(&self) -> Result<(), LogError> {
        let _guard = self.inner.meta_lock.lock().await;
        // Whoever gets the lock writes the newest meta
        let json = self.inner.lock().meta.to_json()?;
        let path = self.inner.dir.join(meta_file_name());
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| LogError::io("rewriting meta record", &path, e))
    }

    async fn wait_idle(&self) {
        loop {
            let signal = {
                let mut state = self.inner.lock();
                if state.is_idle() {
                    return;
                }
                state.listeners.listen(Lifecycle::Idle)
            };
            let _ = signal.await;
        }
    }

    async fn finish(&self) -> Result<(), String> {
        self.wait_idle().await;

        let sequence = {
            let mut state = self.inner.lock();
            state.counter += 1;
            state.counter
        };
        let props = Props::new()
            .with_record_type(RecordType::Close)
            .with_data_type(DataType::Json);
        let name = record_file_name(sequence, &props);
        let path = self.inner.dir.join(&name);
        let close = CloseMeta {
            time_stamp: self.inner.clock.timestamp(),
        };
        let result = match serde_json::to_vec_pretty(&close) {
            Ok(json) => tokio::fs::write(&path, json)
                .await
                .map_err(|e| LogError::io("writing close record", &path, e)),
            Err(e) => Err(e.into()),
        };

        {
            let mut state = self.inner.lock();
            if result.is_ok() {
                state.log_record(sequence, &name);
            }
            state.listeners.notify(Lifecycle::Closed);
        }
        if let Some(log) = self.inner.log.upgrade() {
            log.session_closed(&self.inner.id);
        }
        match &result {
            Ok(()) => tracing::info!(session = %self.inner.id, "session closed"),
            Err(e) => tracing::warn!(session = %self.inner.id, error = %e, "close record failed"),
        }
        result.map_err(|e| e.to_string())
    }
}

fn meta_file_name() -> String {
    let props = Props::new()
        .with_record_type(RecordType::Meta)
        .with_data_type(DataType::Json);
    record_file_name(META_SEQUENCE, &props)
}

impl LogSession for FileSession {
    type Record = FileRecord;

    fn id(&self) -> Option<String> {
        Some(self.inner.id.clone())
    }

    fn index(&self) -> Option<u64> {
        Some(self.inner.index)
    }

    fn parent_id(&self) -> Option<String> {
        self.inner.lock().meta.parent_session.clone()
    }

    fn storage_path(&self) -> Option<PathBuf> {
        Some(self.inner.dir.clone())
    }

    fn props(&self) -> Props {
        self.inner.props.clone()
    }

    fn open_record(&self, labels: LabelSet) -> Completion<FileRecord> {
        let props = labels.into_props(Some(&Props::record_defaults()));
        let sequence = {
            let mut state = self.inner.lock();
            if state.closing {
                return Completion::err(LogError::SessionClosed(self.inner.id.clone()));
            }
            state.counter += 1;
            state.opening += 1;
            state.counter
        };

        let (done, completion) = pair();
        let session = self.clone();
        tokio::spawn(async move {
            let inner = &session.inner;
            let result =
                FileRecord::create(Arc::downgrade(inner), &inner.dir, sequence, props).await;
            {
                let mut state = inner.lock();
                state.opening -= 1;
                match &result {
                    Ok(record) => {
                        state.open.insert(sequence, record.clone());
                    }
                    Err(e) => {
                        tracing::warn!(session = %inner.id, sequence, error = %e, "record open failed");
                        state.settle();
                    }
                }
            }
            done.complete(result);
        });
        completion
    }

    fn write(&self, payload: Payload, labels: Option<LabelSet>) -> Completion {
        let props = payload.props(labels);
        let bytes = match payload.into_bytes(&props) {
            Ok(bytes) => bytes,
            Err(e) => return Completion::err(e.into()),
        };
        let opened = self.open_record(LabelSet::Props(props));
        let (done, completion) = pair();
        tokio::spawn(async move {
            let result = async {
                let record = opened.await?;
                let written = record.write(bytes);
                let closed = record.close();
                written.await?;
                closed.await
            }
            .await;
            done.complete(result);
        });
        completion
    }

    fn open_records(&self) -> Vec<String> {
        self.inner
            .lock()
            .open
            .values()
            .filter_map(|record| record.id())
            .collect()
    }

    fn logged_records(&self) -> Vec<Option<String>> {
        self.inner.lock().logged.clone()
    }

    fn set_parent_session(&self, parent: String) -> Completion {
        self.update_meta(|meta| meta.parent_session = Some(parent))
    }

    fn add_linked_token(&self, token: LinkedToken) -> Completion {
        self.update_meta(|meta| meta.linked_tokens.push(token))
    }

    fn set_user_data(&self, key: String, value: Value) -> Completion {
        self.update_meta(|meta| {
            meta.user_data.insert(key, value);
        })
    }

    fn is_idle(&self) -> bool {
        self.inner.lock().is_idle()
    }

    fn wait(&self) -> Completion {
        let mut state = self.inner.lock();
        if state.is_idle() {
            return Completion::ok(());
        }
        when_fired(state.listeners.listen(Lifecycle::Idle))
    }

    fn close(&self) -> Completion {
        // Refuse new records from the moment close is requested
        self.inner.lock().closing = true;
        let (done, completion) = pair();
        let session = self.clone();
        tokio::spawn(async move {
            let outcome = session
                .inner
                .closed
                .get_or_init(|| session.finish())
                .await
                .clone();
            done.complete(outcome.map_err(|reason| LogError::CloseFailed {
                id: session.inner.id.clone(),
                reason,
            }));
        });
        completion
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
