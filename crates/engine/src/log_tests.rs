// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::testing::{fixture, gated_fixture, settle};
use deferlog_core::{RecordType, Sink};

#[tokio::test]
async fn nothing_is_built_until_a_record_materializes() {
    let f = fixture(FlushArbiter::always());
    let session = f
        .log
        .open_session(None, LabelSet::default())
        .await
        .unwrap();
    let _record = session.record(LabelSet::default());
    settle().await;

    assert_eq!(f.factory.builds(), 0);
    assert!(f.log.real().is_none());
    assert!(f.log.is_empty());
    assert!(f.log.open_sessions().is_empty());
    assert!(f.log.storage_root().is_none());
    f.log.wait().await.unwrap();
}

#[tokio::test]
async fn sessions_share_one_build() {
    let (f, gate) = gated_fixture(FlushArbiter::always());
    let first = f.log.session(None, ["first"]);
    let second = f.log.session(None, ["second"]);

    let a = first.record(LabelSet::default()).write(b"a".to_vec());
    let b = second.record(LabelSet::default()).write(b"b".to_vec());
    settle().await;
    gate.open();
    a.await.unwrap();
    b.await.unwrap();

    assert_eq!(f.factory.builds(), 1);
    assert_eq!(f.engine.sessions().len(), 2);
    assert_eq!(f.log.open_sessions().len(), 2);
}

#[tokio::test]
async fn failed_build_retries_on_next_write() {
    let f = fixture(FlushArbiter::always());
    f.factory.fail_builds(1);
    let session = f.log.session(None, LabelSet::default());
    let record = session.record(LabelSet::default());

    let first = record.write(b"a".to_vec());
    settle().await;
    assert_eq!(f.factory.builds(), 1);
    assert!(f.log.real().is_none());

    let second = record.write(b"b".to_vec());
    first.await.unwrap();
    second.await.unwrap();
    assert_eq!(f.factory.builds(), 2);
    assert_eq!(record.real().unwrap().text(), "ab");
}

#[tokio::test]
async fn wait_follows_the_built_engine() {
    let (f, gate) = gated_fixture(FlushArbiter::always());
    let session = f.log.session(None, LabelSet::default());
    let _written = session.record(LabelSet::default()).write(b"x".to_vec());

    let idle = f.log.wait();
    gate.open();
    idle.await.unwrap();
    assert!(f.log.real().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wait_during_a_concurrent_build_resolves() {
    for _ in 0..50 {
        let f = fixture(FlushArbiter::always());
        let session = f.log.session(None, LabelSet::default());
        let _written = session.record(LabelSet::default()).write(b"x".to_vec());

        let idle = tokio::time::timeout(std::time::Duration::from_secs(5), f.log.wait());
        idle.await.unwrap().unwrap();
        assert!(f.log.real().is_some());
    }
}

#[tokio::test]
async fn arbiter_change_reaches_existing_sessions() {
    let f = fixture(FlushArbiter::never());
    let session = f.log.session(None, LabelSet::default());
    let record = session.record(["RECORD_EXCEPTION"]);
    let written = record.write(b"trace".to_vec());
    settle().await;
    assert_eq!(f.factory.builds(), 0);

    f.log.set_flush_arbiter(FlushArbiter::new(|props| {
        props.record_type == Some(RecordType::Exception)
    }));
    written.await.unwrap();

    let later = f.log.session(None, LabelSet::default());
    let quiet = later.record(["RECORD_DEBUG"]);
    let _pending = quiet.write(b"noise".to_vec());
    settle().await;
    assert!(quiet.real().is_none());
}

#[tokio::test]
async fn flush_reaches_every_session() {
    let f = fixture(FlushArbiter::never());
    let first = f.log.session(None, LabelSet::default()).record(LabelSet::default());
    let second = f.log.session(None, LabelSet::default()).record(LabelSet::default());
    let a = first.write(b"1".to_vec());
    let b = second.write(b"2".to_vec());

    f.log.flush();
    a.await.unwrap();
    b.await.unwrap();
    assert_eq!(f.engine.sessions().len(), 2);
}

#[tokio::test]
async fn debug_reports_materialization() {
    let f = fixture(FlushArbiter::always());
    let _session = f.log.session(None, LabelSet::default());
    let rendered = format!("{:?}", f.log);
    assert!(rendered.contains("materialized: false"), "{rendered}");
    assert!(rendered.contains("sessions: 1"), "{rendered}");
}
