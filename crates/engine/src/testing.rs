// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the deferred layer tests

use crate::DeferredLog;
use deferlog_core::fake::{FactoryGate, FakeEngine, FakeFactory};
use deferlog_core::FlushArbiter;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

pub(crate) struct Fixture {
    pub log: DeferredLog<FakeEngine>,
    pub engine: FakeEngine,
    pub factory: FakeFactory,
}

pub(crate) fn fixture(arbiter: FlushArbiter) -> Fixture {
    let engine = FakeEngine::new();
    let factory = FakeFactory::new(engine.clone());
    Fixture {
        log: DeferredLog::with_arbiter(factory.clone(), arbiter),
        engine,
        factory,
    }
}

/// A fixture whose engine build blocks until the gate opens
pub(crate) fn gated_fixture(arbiter: FlushArbiter) -> (Fixture, FactoryGate) {
    let engine = FakeEngine::new();
    let (factory, gate) = FakeFactory::gated(engine.clone());
    let fixture = Fixture {
        log: DeferredLog::with_arbiter(factory.clone(), arbiter),
        engine,
        factory,
    };
    (fixture, gate)
}

/// Let spawned materialization tasks run to completion
pub(crate) async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

/// Tracing output collected in memory
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
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

/// Run `f` on a fresh runtime with tracing captured
pub(crate) fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
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
