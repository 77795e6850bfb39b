// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use deferlog_core::{labels_to_props, DataType};

async fn text_record(dir: &Path, sequence: u64) -> FileRecord {
    let props = labels_to_props(["DATA_TEXT"], Some(&Props::record_defaults()));
    FileRecord::create(Weak::new(), dir, sequence, props)
        .await
        .unwrap()
}

#[tokio::test]
async fn writes_land_in_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let record = text_record(dir.path(), 2).await;

    let writes: Vec<_> = ["one ", "two ", "three"]
        .iter()
        .map(|chunk| record.write(chunk.as_bytes().to_vec()))
        .collect();
    record.close().await.unwrap();
    for write in writes {
        write.await.unwrap();
    }

    let contents = std::fs::read_to_string(dir.path().join("2-GENERIC.txt")).unwrap();
    assert_eq!(contents, "one two three");
}

#[tokio::test]
async fn accessors_describe_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let record = text_record(dir.path(), 3).await;

    assert_eq!(record.id().as_deref(), Some("3-GENERIC.txt"));
    assert_eq!(record.sequence(), Some(3));
    assert_eq!(record.path(), Some(dir.path().join("3-GENERIC.txt")));
    assert_eq!(record.props().data_type, Some(DataType::Text));
    assert!(record.is_idle());
}

#[tokio::test]
async fn wait_resolves_after_pending_writes() {
    let dir = tempfile::tempdir().unwrap();
    let record = text_record(dir.path(), 2).await;

    drop(record.write(vec![b'x'; 64 * 1024]));
    assert_eq!(record.pending_writes(), 1);
    record.wait().await.unwrap();
    assert_eq!(record.pending_writes(), 0);
}

#[tokio::test]
async fn write_after_close_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let record = text_record(dir.path(), 2).await;
    record.close().await.unwrap();

    let err = record.write(b"late".to_vec()).await.unwrap_err();
    assert!(matches!(err, LogError::RecordClosed(id) if id == "2-GENERIC.txt"));
    assert!(record.is_closed());
}

#[tokio::test]
async fn second_close_waits_for_first() {
    let dir = tempfile::tempdir().unwrap();
    let record = text_record(dir.path(), 2).await;

    drop(record.write(b"data".to_vec()));
    let first = record.close();
    let second = record.close();
    second.await.unwrap();
    assert!(record.is_closed());
    first.await.unwrap();
    record.close().await.unwrap();
}

#[tokio::test]
async fn existing_file_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("2-GENERIC.txt"), "stale contents").unwrap();

    let record = text_record(dir.path(), 2).await;
    drop(record.write(b"new".to_vec()));
    record.close().await.unwrap();

    let contents = std::fs::read_to_string(dir.path().join("2-GENERIC.txt")).unwrap();
    assert_eq!(contents, "new");
}

#[tokio::test]
async fn missing_directory_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let props = Props::record_defaults();
    let result = FileRecord::create(Weak::new(), &dir.path().join("gone"), 2, props).await;
    assert!(matches!(result, Err(e) if e.is_io()));
}
