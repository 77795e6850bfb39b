//! Help output specs

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    let temp = Project::empty();
    temp.deferlog()
        .args(["--help"])
        .passes()
        .stdout_has("write")
        .stdout_has("inspect");
}

#[test]
fn write_help_lists_labels() {
    let temp = Project::empty();
    temp.deferlog()
        .args(["write", "--help"])
        .passes()
        .stdout_has("--label")
        .stdout_has("--session-type");
}
