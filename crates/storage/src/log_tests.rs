// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use deferlog_core::{FakeClock, FixedSeed, IdScheme, SequentialSeed};
use std::sync::Mutex as StdMutex;
use tracing_subscriber::fmt::MakeWriter;

fn config(dir: &Path) -> EngineConfig {
    EngineConfig::default().with_root(dir)
}

async fn open_log(dir: &Path, seed: Arc<dyn SeedSource>) -> FileLog {
    FileLog::open_with(&config(dir), Arc::new(FakeClock::new()), seed)
        .await
        .unwrap()
}

#[tokio::test]
async fn resolves_existing_root() {
    let dir = tempfile::tempdir().unwrap();
    let log = FileLog::open(&config(dir.path())).await.unwrap();

    assert!(!log.used_fallback());
    assert_eq!(log.root(), std::fs::canonicalize(dir.path()).unwrap());
    assert_eq!(log.storage_root(), Some(log.root().to_path_buf()));
}

#[tokio::test]
async fn missing_root_falls_back_to_temp_dir() {
    let dir = tempfile::tempdir().unwrap();
    let log = FileLog::open(&config(&dir.path().join("missing")))
        .await
        .unwrap();

    assert!(log.used_fallback());
    assert_eq!(log.root(), std::env::temp_dir());
}

#[tokio::test]
async fn file_root_falls_back_to_temp_dir() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, "").unwrap();

    let log = FileLog::open(&config(&file)).await.unwrap();
    assert!(log.used_fallback());
}

#[tokio::test]
async fn invalid_template_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bad = config(dir.path()).with_directory_template("{SessionName}");
    let result = FileLog::open(&bad).await;
    assert!(matches!(result, Err(LogError::InvalidTemplate(_))));
}

#[tokio::test]
async fn concurrent_sessions_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let log = open_log(dir.path(), Arc::new(FixedSeed(1_500_000_000_000))).await;

    let first = log.open_session(None, LabelSet::default());
    let second = log.open_session(None, LabelSet::default());
    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert_eq!(first.index(), Some(0));
    assert_eq!(second.index(), Some(1));
    assert_ne!(first.id(), second.id());
    assert!(first.dir().is_dir());
    assert!(second.dir().is_dir());

    let mut open = log.open_sessions();
    open.sort();
    let mut expected = vec![first.id().unwrap(), second.id().unwrap()];
    expected.sort();
    assert_eq!(open, expected);
}

#[tokio::test]
async fn foreign_directories_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("a-GENERIC")).unwrap();
    let log = open_log(dir.path(), Arc::new(FixedSeed(10))).await;

    let session = log
        .open_session(None, LabelSet::default())
        .await
        .unwrap();
    assert_eq!(session.id().as_deref(), Some("b"));
}

#[tokio::test]
async fn wait_resolves_when_sessions_close() {
    let dir = tempfile::tempdir().unwrap();
    let log = open_log(dir.path(), Arc::new(SequentialSeed::new(1))).await;
    log.wait().await.unwrap();

    let session = log
        .open_session(None, LabelSet::default())
        .await
        .unwrap();
    let idle = log.wait();
    session.close().await.unwrap();
    idle.await.unwrap();

    assert!(log.open_sessions().is_empty());
    assert_eq!(log.logged_sessions(), vec![session.id().unwrap()]);
}

#[tokio::test]
async fn uuid_scheme_names_directories() {
    let dir = tempfile::tempdir().unwrap();
    let log = FileLog::open(&config(dir.path()).with_id_scheme(IdScheme::Uuid))
        .await
        .unwrap();

    let session = log
        .open_session(None, ["SESSION_APP_RUN"].into())
        .await
        .unwrap();
    let id = session.id().unwrap();
    assert_eq!(id.len(), 32);
    assert_eq!(
        session.dir().file_name().unwrap().to_string_lossy(),
        format!("{id}-APP_RUN")
    );
}

#[tokio::test]
async fn factory_builds_log() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FileLogFactory::new(config(dir.path())).with_seed(Arc::new(FixedSeed(36)));

    let log = factory.build().await.unwrap();
    let session = log
        .open_session(None, LabelSet::default())
        .await
        .unwrap();
    assert_eq!(session.id().as_deref(), Some("10"));
}

#[tokio::test]
async fn lazy_factory_resolves_at_build() {
    let dir = tempfile::tempdir().unwrap();
    let root = Arc::new(StdMutex::new(None::<PathBuf>));
    let factory = FileLogFactory::lazy({
        let root = Arc::clone(&root);
        move || {
            let root = root.lock().unwrap().clone();
            root.map(|r| EngineConfig::default().with_root(r))
                .ok_or_else(|| LogError::Config("root not decided yet".into()))
        }
    });

    assert!(matches!(factory.build().await, Err(LogError::Config(_))));
    *root.lock().unwrap() = Some(dir.path().to_path_buf());
    let log = factory.build().await.unwrap();
    assert!(!log.used_fallback());
}

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<StdMutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn traces_collisions_and_session_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("a-GENERIC")).unwrap();
    let root = dir.path().to_path_buf();

    let (logs, id) = with_tracing(|| async move {
        let log = open_log(&root, Arc::new(FixedSeed(10))).await;
        let session = log
            .open_session(None, LabelSet::default())
            .await
            .unwrap();
        session.close().await.unwrap();
        session.id().unwrap()
    });

    assert_eq!(id, "b");
    assert!(logs.contains("session id collision"), "{logs}");
    assert!(logs.contains("session opened"), "{logs}");
    assert!(logs.contains("session closed"), "{logs}");
}

#[test]
fn traces_fallback_root() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");

    let (logs, used_fallback) = with_tracing(|| async move {
        FileLog::open(&config(&missing)).await.unwrap().used_fallback()
    });

    assert!(used_fallback);
    assert!(logs.contains("falling back to temp dir"), "{logs}");
}
