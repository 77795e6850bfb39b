//! Configuration of `deferlog write`

use crate::prelude::*;

#[test]
fn config_file_sets_root_and_template() {
    let temp = Project::empty();
    std::fs::create_dir(temp.path().join("store")).unwrap();
    let root = temp.path().join("store");
    let config = temp.file(
        "deferlog.toml",
        &format!(
            "root = {:?}\ndirectory_template = \"run-{{SessionIndex}}{{SessionName}}\"\nid_scheme = \"uuid\"\n",
            root.display().to_string()
        ),
    );

    let config = config.display().to_string();
    temp.deferlog()
        .args(["--config", &config, "write", "--name", "job", "x"])
        .passes();

    let sessions = temp.sessions("store");
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].starts_with("run-"), "{sessions:?}");
    assert!(sessions[0].ends_with("-job"), "{sessions:?}");
    // run- + 32 hex digits + -job
    assert_eq!(sessions[0].len(), 4 + 32 + 4);
}

#[test]
fn environment_root_is_used() {
    let temp = Project::empty();
    std::fs::create_dir(temp.path().join("env-root")).unwrap();

    temp.deferlog()
        .env("DEFERLOG_ROOT", temp.path().join("env-root"))
        .args(["write", "from env"])
        .passes();

    assert_eq!(temp.sessions("env-root").len(), 1);
}
