// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log setup and rotation, grounded on the same `tracing`/`tracing-appender`
//! shape the coordinator's sibling daemon uses.

use crate::error::StartupError;
use autophone_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (autophone.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Initializes the global `tracing` subscriber writing to `config.logfile`.
/// `RUST_LOG` overrides `--loglevel` when set, matching the original's
/// "environment wins over flag" precedent for ops overrides.
pub fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, StartupError> {
    if let Some(parent) = config.logfile.parent() {
        std::fs::create_dir_all(parent).map_err(StartupError::Logging)?;
    }

    let dir = config.logfile.parent().unwrap_or_else(|| std::path::Path::new("."));
    let filename = config
        .logfile
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("autophone.log"));
    let file_appender = tracing_appender::rolling::never(dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.loglevel.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

/// Rotates `config.logfile` if it has grown past [`MAX_LOG_SIZE`], shifting
/// `autophone.log` → `.1` → `.2` → `.3` and dropping the oldest. Best-effort:
/// a rotation failure never blocks startup.
pub fn rotate_log_if_needed(config: &Config) {
    let size = match std::fs::metadata(&config.logfile) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = config.logfile.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(&config.logfile, format!("{log_str}.1"));
}
