// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File and directory names of the file engine

use deferlog_core::{extension_for, Props, RecordType, SessionType};

/// Record file name: `{sequence}-{RecordType}[-{Name}].{ext}`
pub fn record_file_name(sequence: u64, props: &Props) -> String {
    let record_type = props.record_type.unwrap_or(RecordType::Generic);
    let name = props
        .name
        .as_deref()
        .map(|n| format!("-{n}"))
        .unwrap_or_default();
    format!(
        "{sequence}-{}{name}.{}",
        record_type.as_str(),
        extension_for(props.data_type)
    )
}

/// Session directory name from `template` and the allocated identifier
pub fn session_dir_name(template: &str, id: &str, props: &Props) -> String {
    let name = props
        .name
        .as_deref()
        .map(|n| format!("-{n}"))
        .unwrap_or_default();
    let session_type = props.session_type.unwrap_or(SessionType::Generic);
    template
        .replace("{SessionIndex}", id)
        .replace("{SessionName}", &name)
        .replace("{SessionType}", session_type.as_str())
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
