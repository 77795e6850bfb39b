//! Error reporting specs

use crate::prelude::*;

#[test]
fn unknown_session_type_is_rejected() {
    let temp = Project::empty();
    temp.deferlog()
        .args(["write", "--root", ".", "--session-type", "batch", "x"])
        .fails()
        .stderr_has("unknown session type");
}

#[test]
fn invalid_json_is_rejected() {
    let temp = Project::empty();
    temp.deferlog()
        .args(["write", "--root", ".", "--json", "{nope"])
        .fails()
        .stderr_has("parsing JSON contents");
}

#[test]
fn bad_config_is_reported() {
    let temp = Project::empty();
    let config = temp.file("deferlog.toml", "flush_policy = \"sometimes\"\n");
    let config = config.display().to_string();
    temp.deferlog()
        .args(["--config", &config, "inspect"])
        .fails()
        .stderr_has("loading config");
}

#[test]
fn inspect_needs_a_root() {
    let temp = Project::empty();
    temp.deferlog()
        .args(["inspect"])
        .fails()
        .stderr_has("no storage root");
}
