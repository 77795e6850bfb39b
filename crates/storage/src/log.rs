// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed log: a root directory holding one directory per session

use crate::allocate::IdAllocator;
use crate::session::FileSession;
use async_trait::async_trait;
use deferlog_core::{
    pair, when_fired, Clock, Completion, EngineConfig, EngineFactory, LabelSet, Lifecycle,
    Listeners, LogEngine, LogError, LogSession, Props, SeedSource, SystemClock, SystemSeed,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct LogState {
    next_index: u64,
    /// Sessions requested but not yet open
    opening: usize,
    open: BTreeMap<String, FileSession>,
    logged: Vec<String>,
    listeners: Listeners,
}

impl LogState {
    fn is_idle(&self) -> bool {
        self.opening == 0 && self.open.is_empty()
    }

    fn settle(&mut self) {
        if self.is_idle() {
            self.listeners.notify(Lifecycle::Idle);
        }
    }
}

pub(crate) struct LogInner {
    root: PathBuf,
    used_fallback: bool,
    template: String,
    allocator: IdAllocator,
    clock: Arc<dyn Clock>,
    state: Mutex<LogState>,
}

impl LogInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A session finished closing
    pub(crate) fn session_closed(&self, id: &str) {
        let mut state = self.lock();
        if state.open.remove(id).is_some() {
            state.logged.push(id.to_string());
        }
        state.settle();
    }
}

/// Log engine writing sessions below a root directory
#[derive(Clone)]
pub struct FileLog {
    inner: Arc<LogInner>,
}

impl FileLog {
    /// Open a log with the system clock and time seed
    pub async fn open(config: &EngineConfig) -> Result<Self, LogError> {
        Self::open_with(config, Arc::new(SystemClock), Arc::new(SystemSeed)).await
    }

    pub async fn open_with(
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        seed: Arc<dyn SeedSource>,
    ) -> Result<Self, LogError> {
        config.validate()?;
        let (root, used_fallback) = resolve_root(config.root.as_deref()).await;
        if used_fallback {
            tracing::warn!(
                requested = ?config.root,
                root = %root.display(),
                "storage root unusable, falling back to temp dir"
            );
        }
        Ok(Self {
            inner: Arc::new(LogInner {
                root,
                used_fallback,
                template: config.directory_template.clone(),
                allocator: IdAllocator::new(config.id_scheme, seed, config.id_retry_limit),
                clock,
                state: Mutex::new(LogState::default()),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// True when the configured root was missing or not a directory
    pub fn used_fallback(&self) -> bool {
        self.inner.used_fallback
    }
}

/// Canonical form of `requested`, or the temp dir when it is unusable
async fn resolve_root(requested: Option<&Path>) -> (PathBuf, bool) {
    if let Some(path) = requested {
        let is_dir = tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            if let Ok(resolved) = tokio::fs::canonicalize(path).await {
                return (resolved, false);
            }
        }
    }
    (std::env::temp_dir(), true)
}

impl LogEngine for FileLog {
    type Session = FileSession;

    fn open_session(&self, parent: Option<String>, labels: LabelSet) -> Completion<FileSession> {
        let props = labels.into_props(Some(&Props::session_defaults()));
        let index = {
            let mut state = self.inner.lock();
            let index = state.next_index;
            state.next_index += 1;
            state.opening += 1;
            index
        };

        let (done, completion) = pair();
        let log = self.clone();
        tokio::spawn(async move {
            let inner = &log.inner;
            let result = async {
                let allocation = inner
                    .allocator
                    .allocate(&inner.root, &inner.template, &props)
                    .await?;
                FileSession::create(
                    Arc::downgrade(inner),
                    allocation.id,
                    index,
                    allocation.dir,
                    parent,
                    props,
                    Arc::clone(&inner.clock),
                )
                .await
            }
            .await;

            {
                let mut state = inner.lock();
                state.opening -= 1;
                match &result {
                    Ok(session) => {
                        let id = session.id().unwrap_or_default();
                        tracing::info!(session = %id, index, "session opened");
                        state.open.insert(id, session.clone());
                    }
                    Err(e) => {
                        tracing::warn!(index, error = %e, "session open failed");
                        state.settle();
                    }
                }
            }
            done.complete(result);
        });
        completion
    }

    fn open_sessions(&self) -> Vec<String> {
        self.inner.lock().open.keys().cloned().collect()
    }

    fn logged_sessions(&self) -> Vec<String> {
        self.inner.lock().logged.clone()
    }

    fn storage_root(&self) -> Option<PathBuf> {
        Some(self.inner.root.clone())
    }

    fn wait(&self) -> Completion {
        let mut state = self.inner.lock();
        if state.is_idle() {
            return Completion::ok(());
        }
        when_fired(state.listeners.listen(Lifecycle::Idle))
    }
}

type ConfigFn = dyn Fn() -> Result<EngineConfig, LogError> + Send + Sync;

enum ConfigSource {
    Ready(EngineConfig),
    /// Resolved when the log is built
    Lazy(Arc<ConfigFn>),
}

/// Builds a [`FileLog`] when the deferred layer first needs one
pub struct FileLogFactory {
    config: ConfigSource,
    clock: Arc<dyn Clock>,
    seed: Arc<dyn SeedSource>,
}

impl FileLogFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self::from_source(ConfigSource::Ready(config))
    }

    /// Resolve the configuration only at build time
    pub fn lazy(
        config: impl Fn() -> Result<EngineConfig, LogError> + Send + Sync + 'static,
    ) -> Self {
        Self::from_source(ConfigSource::Lazy(Arc::new(config)))
    }

    fn from_source(config: ConfigSource) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            seed: Arc::new(SystemSeed),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_seed(mut self, seed: Arc<dyn SeedSource>) -> Self {
        self.seed = seed;
        self
    }
}

#[async_trait]
impl EngineFactory for FileLogFactory {
    type Engine = FileLog;

    async fn build(&self) -> Result<FileLog, LogError> {
        let config = match &self.config {
            ConfigSource::Ready(config) => config.clone(),
            ConfigSource::Lazy(resolve) => resolve()?,
        };
        FileLog::open_with(&config, Arc::clone(&self.clock), Arc::clone(&self.seed)).await
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
