// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet Registry (§4.E): register/read_cache/update_cache over the
//! persisted [`FleetCache`].

use crate::ctx::{DaemonCtx, FleetEntry};
use autophone_core::{FleetCache, PhoneConfig};
use autophone_worker::{PhoneWorkerHandle, PhoneWorkerParams};
use std::path::Path;
use std::sync::Arc;

/// Registers `phone`, starting a new worker if `phone_id` is not already
/// known. Idempotent for an existing `phone_id` (§4.E, §9 "update fields in
/// place, do not restart the worker"): the stored config is refreshed and the
/// cache is persisted, but the running worker task is left alone.
///
/// A cache-write failure here is fatal to the coordinator (§7): it is logged
/// and the coordinator is asked to shut down, mirroring the original's
/// `print 'ERROR: could not write cache file, exiting'; self.stop()`.
pub fn register(ctx: &Arc<DaemonCtx>, phone: PhoneConfig) {
    let mut fleet = ctx.fleet.lock();
    match fleet.get_mut(&phone.phone_id) {
        Some(entry) => {
            tracing::info!(phone_id = %phone.phone_id, "register: phone already known, updating fields in place");
            entry.config = phone;
        }
        None => {
            tracing::info!(phone_id = %phone.phone_id, "register: starting new worker");
            let handle = spawn_worker(ctx, phone.clone());
            fleet.insert(phone.phone_id.clone(), FleetEntry { config: phone, handle });
        }
    }
    drop(fleet);

    if let Err(e) = update_cache(ctx) {
        tracing::error!(error = %e, "could not write cache file, exiting");
        ctx.shutdown.notify_one();
    }
}

/// Loads the persisted fleet on startup and registers each entry without
/// starting jobs (§4.E `read_cache`). Jobs are only ever dispatched by the
/// Dispatcher once a build event or `triggerjobs` command arrives.
pub fn read_cache(ctx: &Arc<DaemonCtx>) -> Result<(), autophone_core::CacheError> {
    let cache = FleetCache::load(&ctx.config.cache_path)?;
    for phone in cache.phones {
        register(ctx, phone);
    }
    Ok(())
}

/// Atomically rewrites the cache file with the fleet's current configs.
pub fn update_cache(ctx: &Arc<DaemonCtx>) -> Result<(), autophone_core::CacheError> {
    ctx.cache_snapshot().save(&ctx.config.cache_path)
}

/// Starts afresh: truncates/creates an empty cache, ignoring any prior
/// fleet (§4.E "Cache policy on startup", the non-`--restarting` branch).
pub fn reset_cache(cache_path: &Path) -> Result<(), autophone_core::CacheError> {
    FleetCache::default().save(cache_path)
}

fn spawn_worker(ctx: &Arc<DaemonCtx>, phone: PhoneConfig) -> PhoneWorkerHandle {
    let phone_id = phone.phone_id.clone();
    let log_path = ctx.config.worker_logfile(&phone_id);
    let (handle, _join) = autophone_worker::spawn(PhoneWorkerParams {
        phone,
        tuning: ctx.config.tuning,
        driver: ctx.driver.clone(),
        plugins: ctx.plugins.clone(),
        notifier: Some(ctx.notifier.clone()),
        clock: ctx.clock.clone(),
        status_tx: ctx.status_tx.clone(),
        log_path,
        callback_ip: ctx.config.ipaddr.clone(),
        callback_port: ctx.config.port,
    });
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{phone, test_ctx};

    #[tokio::test]
    async fn register_starts_a_worker_and_persists_cache() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        register(&ctx, phone("aa_bb_nexus4"));

        assert!(ctx.fleet.lock().contains_key("aa_bb_nexus4"));
        let cache = FleetCache::load(&ctx.config.cache_path).unwrap();
        assert_eq!(cache.phones.len(), 1);
    }

    #[tokio::test]
    async fn register_for_known_phone_id_updates_fields_without_restarting() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        register(&ctx, phone("aa_bb_nexus4"));

        let mut updated = phone("aa_bb_nexus4");
        updated.ip = "10.0.0.99".to_string();
        register(&ctx, updated);

        let fleet = ctx.fleet.lock();
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet.get("aa_bb_nexus4").unwrap().config.ip, "10.0.0.99");
    }

    #[tokio::test]
    async fn read_cache_reregisters_without_dispatching_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        register(&ctx, phone("aa_bb_nexus4"));

        // A fresh coordinator pointed at the same cache file, simulating a restart.
        let ctx2 = test_ctx(dir.path());
        read_cache(&ctx2).unwrap();
        assert!(ctx2.fleet.lock().contains_key("aa_bb_nexus4"));
    }
}
