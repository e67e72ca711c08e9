// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted fleet cache (§3, §4.E).

use crate::job::PhoneConfig;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors from reading or writing the fleet cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read cache file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The persisted mapping of registered phones, `{"phones": [PhoneConfig, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetCache {
    #[serde(default)]
    pub phones: Vec<PhoneConfig>,
}

impl FleetCache {
    /// Load the cache from `path`.
    ///
    /// A missing file, an empty file, or invalid JSON are all treated as an
    /// empty fleet (§7 "Cache file parse failure"). An I/O error reading an
    /// existing, non-empty file is propagated — that signals something more
    /// serious than a garbled/blown-away cache.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(CacheError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }

    /// Atomically rewrite the cache file: serialize to a temp file in the
    /// same directory, fsync, then rename over `path` (§4.E `update_cache`).
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());

        let write_result = (|| -> io::Result<()> {
            std::fs::write(&tmp_path, json.as_bytes())?;
            let file = std::fs::File::open(&tmp_path)?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, path)?;
            if let Some(dir) = path.parent() {
                if let Ok(dir_file) = std::fs::File::open(dir) {
                    let _ = dir_file.sync_all();
                }
            }
            Ok(())
        })();

        write_result.map_err(|source| CacheError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn contains(&self, phone_id: &str) -> bool {
        self.phones.iter().any(|p| p.phone_id == phone_id)
    }

    pub fn upsert(&mut self, cfg: PhoneConfig) {
        if let Some(existing) = self.phones.iter_mut().find(|p| p.phone_id == cfg.phone_id) {
            *existing = cfg;
        } else {
            self.phones.push(cfg);
        }
    }
}

#[cfg(test)]
#[path = "fleet_cache_tests.rs"]
mod tests;
