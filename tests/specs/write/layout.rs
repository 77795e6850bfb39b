//! Session layout produced by `deferlog write`

use crate::prelude::*;

#[test]
fn write_creates_meta_record_and_close() {
    let temp = Project::empty();
    std::fs::create_dir(temp.path().join("logs")).unwrap();

    let out = temp
        .deferlog()
        .args(["write", "--root", "logs", "--label", "DATA_TEXT", "hello"])
        .passes();

    let sessions = temp.sessions("logs");
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].ends_with("-GENERIC"), "{sessions:?}");
    assert!(out.stdout().trim().ends_with(&sessions[0]));

    let dir = temp.path().join("logs").join(&sessions[0]);
    let mut files: Vec<String> = std::fs::read_dir(&dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["1-META.json", "2-GENERIC.txt", "3-CLOSE.json"]);
    assert_eq!(std::fs::read_to_string(dir.join("2-GENERIC.txt")).unwrap(), "hello");

    let close: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("3-CLOSE.json")).unwrap()).unwrap();
    assert!(close["TimeStamp"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn meta_names_parent_and_type() {
    let temp = Project::empty();
    std::fs::create_dir(temp.path().join("logs")).unwrap();

    temp.deferlog()
        .args([
            "write",
            "--root",
            "logs",
            "--parent",
            "outer",
            "--session-type",
            "server-request",
            "--name",
            "checkout",
            "--json",
            r#"{"status":200}"#,
        ])
        .passes();

    let sessions = temp.sessions("logs");
    assert!(sessions[0].ends_with("-SERVER_REQUEST-checkout"), "{sessions:?}");
    let dir = temp.path().join("logs").join(&sessions[0]);
    let meta: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("1-META.json")).unwrap()).unwrap();
    assert_eq!(meta["Protocol"], "deferlog");
    assert_eq!(meta["ParentSession"], "outer");
    assert_eq!(meta["SessionType"], "SERVER_REQUEST");
    assert_eq!(meta["Name"], "checkout");
    assert_eq!(meta["LogSession"].as_str().unwrap(), sessions[0].split('-').next().unwrap());
    assert_eq!(
        std::fs::read_to_string(dir.join("2-GENERIC.json")).unwrap(),
        r#"{"status":200}"#
    );
}

#[test]
fn sessions_get_distinct_directories() {
    let temp = Project::empty();
    std::fs::create_dir(temp.path().join("logs")).unwrap();

    for text in ["one", "two", "three"] {
        temp.deferlog()
            .args(["write", "--root", "logs", text])
            .passes();
    }

    assert_eq!(temp.sessions("logs").len(), 3);
}
