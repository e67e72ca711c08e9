// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-phone activity log (§6 "Per-worker logfile").
//!
//! Writes human-readable timestamped lines to the path computed by
//! [`autophone_core::Config::worker_logfile`], independent of the process-
//! wide `tracing` subscriber: an operator tailing one phone's log should
//! never have to grep it out of the interleaved daemon log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Appends timestamped lines to a single phone's dedicated logfile.
pub struct WorkerLog {
    path: PathBuf,
}

impl WorkerLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one line. Failures are logged via `tracing` but never
    /// propagate: a full disk must not stop the worker loop.
    pub fn append(&self, message: &str) {
        if let Err(e) = self.write_line(message) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write worker logfile");
        }
    }

    fn write_line(&self, message: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        writeln!(file, "{epoch} {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_creates_parent_dirs_and_writes_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("autophone-p1.log");
        let log = WorkerLog::new(path.clone());
        log.append("hello");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("hello\n"));
    }

    #[test]
    fn append_is_cumulative_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autophone-p1.log");
        let log = WorkerLog::new(path.clone());
        log.append("first");
        log.append("second");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
