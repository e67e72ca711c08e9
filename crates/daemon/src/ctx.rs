// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared coordinator context, the daemon's counterpart to the teacher's
//! `ListenCtx` (`oj-daemon/src/listener/mod.rs`): one struct handed to every
//! module as an `Arc`, never a global singleton.

use autophone_adapters::{DeviceDriver, Downloader, Notifier, TestPlugin};
use autophone_core::{Clock, Config, FleetCache, PhoneConfig, StatusMessage, WorkerView};
use autophone_worker::PhoneWorkerHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// A registered phone and the worker task driving it.
pub struct FleetEntry {
    pub config: PhoneConfig,
    pub handle: PhoneWorkerHandle,
}

/// Everything a running coordinator needs, assembled once at startup.
///
/// `fleet` is guarded by `worker_lock` (§5): the single mutex serializing
/// fleet-map mutations across `register`, `status`, and broadcast. `views` is
/// the Status Aggregator's exclusive state (§4.G, §9 "Cross-process state"):
/// nothing else ever writes to it. `cmd_lock` serializes the whole of
/// `route_command` (§4.H) so two connections' commands never interleave.
pub struct DaemonCtx {
    pub config: Config,
    pub driver: Arc<dyn DeviceDriver>,
    pub downloader: Arc<dyn Downloader>,
    pub plugins: Vec<Arc<dyn TestPlugin>>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub status_tx: mpsc::Sender<StatusMessage>,
    pub fleet: Mutex<HashMap<String, FleetEntry>>,
    pub views: Mutex<HashMap<String, WorkerView>>,
    pub cmd_lock: tokio::sync::Mutex<()>,
    pub start_time: Instant,
    pub shutdown: tokio::sync::Notify,
}

impl DaemonCtx {
    /// Snapshot the fleet's current [`FleetCache`] shape for `update_cache()`.
    pub fn cache_snapshot(&self) -> FleetCache {
        let fleet = self.fleet.lock();
        FleetCache {
            phones: fleet.values().map(|e| e.config.clone()).collect(),
        }
    }
}
