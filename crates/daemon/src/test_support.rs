// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for the daemon's unit tests.

use crate::ctx::DaemonCtx;
use autophone_adapters::{FakeDeviceDriver, FakeDownloader, FakeMailTransport, Mailer};
use autophone_core::config::{LogLevel, WorkerTuning};
use autophone_core::{Config, EmailSettings, FakeClock, PhoneConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub fn test_config(cache_path: PathBuf) -> Config {
    Config {
        restarting: false,
        reboot_phones: true,
        ipaddr: "127.0.0.1".to_string(),
        port: 28001,
        cache_path,
        logfile: PathBuf::from("/tmp/autophone-test.log"),
        loglevel: LogLevel::Debug,
        test_path: PathBuf::from("tests/manifest.ini"),
        emailcfg_path: PathBuf::from("email.ini"),
        email: EmailSettings::default(),
        tuning: WorkerTuning {
            idle_probe_timeout: Duration::from_millis(50),
            inter_test_sleep: Duration::from_millis(1),
            max_reboot_attempts: 3,
            max_reboot_wait: Duration::from_millis(20),
            reboot_probe_interval: Duration::from_millis(5),
        },
    }
}

pub fn test_ctx(dir: &Path) -> Arc<DaemonCtx> {
    let (status_tx, _status_rx) = mpsc::channel(256);
    Arc::new(DaemonCtx {
        config: test_config(dir.join("cache.json")),
        driver: Arc::new(FakeDeviceDriver::default()),
        downloader: Arc::new(FakeDownloader::default()),
        plugins: Vec::new(),
        notifier: Arc::new(Mailer::with_transport(
            dir.join("email.ini"),
            FakeMailTransport::default(),
        )),
        clock: Arc::new(FakeClock::new(1_700_000_000)),
        status_tx,
        fleet: parking_lot::Mutex::new(HashMap::new()),
        views: parking_lot::Mutex::new(HashMap::new()),
        cmd_lock: tokio::sync::Mutex::new(()),
        start_time: std::time::Instant::now(),
        shutdown: tokio::sync::Notify::new(),
    })
}

pub fn phone(id: &str) -> PhoneConfig {
    PhoneConfig {
        phone_id: id.to_string(),
        serial: "SERIAL1".to_string(),
        ip: "10.0.0.5".to_string(),
        sut_cmd_port: 20701,
        machine_type: "nexus4".to_string(),
        os_version: "6.0".to_string(),
    }
}
