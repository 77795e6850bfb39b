// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use deferlog_core::FlushPolicy;

fn args(text: &str, root: &std::path::Path) -> WriteArgs {
    WriteArgs {
        text: text.to_string(),
        root: Some(root.to_path_buf()),
        parent: None,
        name: None,
        session_type: None,
        labels: Vec::new(),
        json: false,
    }
}

#[test]
fn session_types_parse_loosely() {
    assert_eq!(parse_session_type("app-run"), Ok(SessionType::AppRun));
    assert_eq!(parse_session_type("SERVER_REQUEST"), Ok(SessionType::ServerRequest));
    assert!(parse_session_type("batch").is_err());
}

#[tokio::test]
async fn writes_text_record() {
    let dir = tempfile::tempdir().unwrap();
    let session_dir = write(args("hello", dir.path()), EngineConfig::default())
        .await
        .unwrap();

    assert!(session_dir.starts_with(std::fs::canonicalize(dir.path()).unwrap()));
    let text = std::fs::read_to_string(session_dir.join("2-GENERIC.txt")).unwrap();
    assert_eq!(text, "hello");
    assert!(session_dir.join("3-CLOSE.json").is_file());
}

#[tokio::test]
async fn never_policy_does_not_stop_explicit_writes() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::default().with_flush_policy(FlushPolicy::Never);
    let mut args = args(r#"{"ok":true}"#, dir.path());
    args.json = true;
    args.labels = vec!["RECORD_DEBUG".into(), "result".into()];
    args.session_type = Some(SessionType::AppRun);
    args.name = Some("nightly".into());

    let session_dir = write(args, config).await.unwrap();
    let name = session_dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.ends_with("-APP_RUN-nightly"), "{name}");
    let text = std::fs::read_to_string(session_dir.join("2-DEBUG-result.bin")).unwrap();
    assert_eq!(text, r#"{"ok":true}"#);
}

#[tokio::test]
async fn invalid_json_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut args = args("{not json", dir.path());
    args.json = true;
    let err = write(args, EngineConfig::default()).await.unwrap_err();
    assert!(err.to_string().contains("parsing JSON"), "{err}");
}
