//! `deferlog inspect` listing specs

use crate::prelude::*;

#[test]
fn inspect_lists_written_sessions() {
    let temp = Project::empty();
    std::fs::create_dir(temp.path().join("logs")).unwrap();
    temp.deferlog()
        .args(["write", "--root", "logs", "--session-type", "app-run", "first"])
        .passes();

    temp.deferlog()
        .args(["inspect", "--root", "logs"])
        .passes()
        .stdout_has("APP_RUN")
        .stdout_has("closed");
}

#[test]
fn inspect_json_reports_record_counts() {
    let temp = Project::empty();
    std::fs::create_dir(temp.path().join("logs")).unwrap();
    temp.deferlog()
        .args(["write", "--root", "logs", "--parent", "p-1", "body"])
        .passes();

    let out = temp
        .deferlog()
        .args(["inspect", "--root", "logs", "--format", "json"])
        .passes();
    let listed: serde_json::Value = serde_json::from_str(&out.stdout()).unwrap();
    let sessions = listed.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["records"], 3);
    assert_eq!(sessions[0]["closed"], true);
    assert_eq!(sessions[0]["parent_session"], "p-1");
}

#[test]
fn inspect_empty_root_says_so() {
    let temp = Project::empty();
    std::fs::create_dir(temp.path().join("logs")).unwrap();
    temp.deferlog()
        .args(["inspect", "--root", "logs"])
        .passes()
        .stderr_has("No sessions");
}
