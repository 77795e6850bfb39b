//! Shared helpers for CLI specs

#![allow(dead_code)]

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch storage root
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the root
    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// A `deferlog` invocation with a clean environment
    pub fn deferlog(&self) -> Cli {
        let mut cmd = Command::cargo_bin("deferlog").unwrap();
        cmd.current_dir(self.path()).env_remove("DEFERLOG_ROOT").env_remove("RUST_LOG");
        Cli { cmd }
    }

    /// Session directories under `root`, sorted
    pub fn sessions(&self, root: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path().join(root))
            .unwrap()
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(mut self) -> Output {
        Output(self.cmd.assert().success())
    }

    pub fn fails(mut self) -> Output {
        Output(self.cmd.assert().failure())
    }
}

pub struct Output(Assert);

impl Output {
    pub fn stdout_has(self, text: &str) -> Self {
        Output(self.0.stdout(predicate::str::contains(text)))
    }

    pub fn stderr_has(self, text: &str) -> Self {
        Output(self.0.stderr(predicate::str::contains(text)))
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.0.get_output().stdout).into_owned()
    }
}
