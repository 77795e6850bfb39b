// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Render items one per line, or as a pretty JSON array
pub fn render_list<T: Serialize + std::fmt::Display>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => items
            .iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => serde_json::to_string_pretty(items).unwrap_or_default(),
    }
}

pub fn print_list<T: Serialize + std::fmt::Display>(items: &[T], format: OutputFormat) {
    println!("{}", render_list(items, format));
}
