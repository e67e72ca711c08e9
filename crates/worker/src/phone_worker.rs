// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Phone Worker (§4.D): one supervised `tokio` task per physical device,
//! driving the `IDLE → INSTALLING → TESTING → REBOOTING → DISCONNECTED →
//! DISABLED` state machine over a bounded command queue.

use crate::recovery::{recover, RecoveryOutcome};
use crate::worker_log::WorkerLog;
use autophone_adapters::{DeviceDriver, Notifier, TestPlugin};
use autophone_core::{Clock, Job, PhoneConfig, StatusMessage, WorkerCommand, WorkerState, WorkerTuning};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Depth of the bounded command queue (§5 "Concurrency & resource model").
/// A producer that outruns this is dropped with a warning, never blocked.
pub const COMMAND_QUEUE_CAPACITY: usize = 32;
/// Depth of the bounded status queue consumed by the aggregator.
pub const STATUS_QUEUE_CAPACITY: usize = 256;

/// Everything a worker needs to run, assembled by the daemon at registration
/// time.
pub struct PhoneWorkerParams {
    pub phone: PhoneConfig,
    pub tuning: WorkerTuning,
    pub driver: Arc<dyn DeviceDriver>,
    pub plugins: Vec<Arc<dyn TestPlugin>>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub clock: Arc<dyn Clock>,
    pub status_tx: mpsc::Sender<StatusMessage>,
    pub log_path: std::path::PathBuf,
    pub callback_ip: String,
    pub callback_port: u16,
}

/// Coordinator-side view of a running worker: the narrow API of §4.D's
/// "Public operations" table.
#[derive(Clone)]
pub struct PhoneWorkerHandle {
    phone_id: String,
    tx: mpsc::Sender<WorkerCommand>,
    stop_flag: Arc<AtomicBool>,
}

impl PhoneWorkerHandle {
    pub fn phone_id(&self) -> &str {
        &self.phone_id
    }

    /// Enqueue a job. Non-blocking; a full queue drops the job with a
    /// warning rather than blocking the caller (§7 "Command queue full").
    pub fn add_job(&self, job: Job) {
        self.send(WorkerCommand::Job(job));
    }

    /// Enqueue a reboot request. Same drop-on-full policy as `add_job`.
    pub fn reboot(&self) {
        self.send(WorkerCommand::Reboot);
    }

    /// Set `stop_flag` and enqueue `Shutdown` (§4.D `stop()`). The flag lets
    /// a worker mid-test-battery notice the request between tests rather
    /// than only at the next command-queue poll.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.send(WorkerCommand::Shutdown);
    }

    fn send(&self, cmd: WorkerCommand) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(cmd) {
            tracing::warn!(phone_id = %self.phone_id, "command queue full, dropping command");
        }
    }
}

/// Spawns the worker task and returns a handle to it plus its `JoinHandle`
/// (for `stop()` callers that want to await completion).
pub fn spawn(params: PhoneWorkerParams) -> (PhoneWorkerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let phone_id = params.phone.phone_id.clone();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let worker = Worker {
        phone: params.phone,
        tuning: params.tuning,
        driver: params.driver,
        plugins: params.plugins,
        notifier: params.notifier,
        clock: params.clock,
        status_tx: params.status_tx,
        log: WorkerLog::new(params.log_path),
        callback_ip: params.callback_ip,
        callback_port: params.callback_port,
        cmd_rx: rx,
        stop_flag: stop_flag.clone(),
        state: WorkerState::Idle,
        disabled: false,
        skipped_jobs: Vec::new(),
    };
    let join = tokio::spawn(worker.run());
    (PhoneWorkerHandle { phone_id, tx, stop_flag }, join)
}

struct Worker {
    phone: PhoneConfig,
    tuning: WorkerTuning,
    driver: Arc<dyn DeviceDriver>,
    plugins: Vec<Arc<dyn TestPlugin>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Arc<dyn Clock>,
    status_tx: mpsc::Sender<StatusMessage>,
    log: WorkerLog,
    callback_ip: String,
    callback_port: u16,
    cmd_rx: mpsc::Receiver<WorkerCommand>,
    stop_flag: Arc<AtomicBool>,
    state: WorkerState,
    disabled: bool,
    skipped_jobs: Vec<Job>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                break;
            }
            match tokio::time::timeout(self.tuning.idle_probe_timeout, self.cmd_rx.recv()).await {
                Err(_elapsed) => self.idle_probe().await,
                Ok(None) => break,
                Ok(Some(WorkerCommand::Shutdown)) => break,
                Ok(Some(WorkerCommand::Reboot)) => self.handle_reboot().await,
                Ok(Some(WorkerCommand::Job(job))) => self.handle_job(job).await,
            }
        }
    }

    /// Timeout path: a cheap liveness probe, never Recovery (§9 Open
    /// Question: a `DISCONNECTED` idle probe does not trigger recovery).
    async fn idle_probe(&mut self) {
        if self.disabled {
            return;
        }
        let alive = self.driver.shell_probe(&self.phone.serial).await;
        if alive {
            self.emit(WorkerState::Idle, None, None);
        } else {
            self.emit(WorkerState::Disconnected, None, None);
        }
    }

    async fn handle_job(&mut self, job: Job) {
        if self.disabled {
            self.skipped_jobs.push(job);
            return;
        }

        self.emit(WorkerState::Installing, Some(job.build_date), None);

        if let Err(e) = self
            .driver
            .install_build(
                &self.phone.phone_id,
                &job.build_url,
                &job.android_proc_name,
                &self.phone.serial,
            )
            .await
        {
            tracing::error!(phone_id = %self.phone.phone_id, error = %e, "install failed");
            return;
        }

        self.emit(WorkerState::Testing, Some(job.build_date), None);

        for plugin in self.plugins.clone() {
            if self.disabled || self.stop_flag.load(Ordering::Relaxed) {
                break;
            }

            tokio::time::sleep(self.tuning.inter_test_sleep).await;

            let mut attempt = 0;
            loop {
                attempt += 1;
                match plugin.run(&job, &self.phone).await {
                    Ok(()) => break,
                    Err(e) => {
                        tracing::warn!(
                            phone_id = %self.phone.phone_id,
                            test = plugin.name(),
                            attempt,
                            error = %e,
                            "test run failed"
                        );

                        self.emit(WorkerState::Rebooting, Some(job.build_date), None);
                        match recover(self.driver.as_ref(), &self.phone, &self.tuning).await {
                            RecoveryOutcome::Recovered => {
                                self.emit(WorkerState::Testing, Some(job.build_date), None);
                                if attempt >= 2 {
                                    tracing::warn!(
                                        phone_id = %self.phone.phone_id,
                                        test = plugin.name(),
                                        "giving up on it"
                                    );
                                    break;
                                }
                            }
                            RecoveryOutcome::GaveUp { attempts } => {
                                self.emit(WorkerState::Disconnected, Some(job.build_date), None);
                                self.disable(attempts).await;
                                self.emit(WorkerState::Disabled, None, None);
                                break;
                            }
                        }
                    }
                }
            }
        }
        // No explicit IDLE emission on a completed, still-enabled job; the
        // next idle-probe timeout observes liveness and emits it (§4.D).
    }

    async fn handle_reboot(&mut self) {
        self.emit(WorkerState::Rebooting, None, None);
        if let Err(e) = self
            .driver
            .sut_reboot(
                &self.phone.ip,
                self.phone.sut_cmd_port,
                &self.callback_ip,
                self.callback_port,
            )
            .await
        {
            tracing::warn!(phone_id = %self.phone.phone_id, error = %e, "explicit reboot failed");
        }
        self.emit(WorkerState::Idle, None, Some("phone reset".to_string()));
    }

    async fn disable(&mut self, attempts: u32) {
        self.disabled = true;
        if let Some(notifier) = &self.notifier {
            notifier
                .notify(
                    &format!("Phone {} disabled", self.phone.phone_id),
                    &format!("rebooted {attempts} times; giving up"),
                )
                .await;
        }
    }

    fn emit(&mut self, state: WorkerState, build: Option<u64>, detail: Option<String>) {
        self.state = state;
        let mut msg = StatusMessage::new(&self.phone.phone_id, state, self.clock.epoch_secs());
        if let Some(build) = build {
            msg = msg.with_build(build);
        }
        if let Some(detail) = detail {
            msg = msg.with_detail(detail);
        }
        self.log.append(&msg.short_desc());
        if let Err(mpsc::error::TrySendError::Full(_)) = self.status_tx.try_send(msg) {
            tracing::warn!(phone_id = %self.phone.phone_id, "status queue full, dropping status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autophone_adapters::{FakeDeviceDriver, FakeTestPlugin};
    use autophone_core::FakeClock;
    use std::time::Duration;

    fn phone() -> PhoneConfig {
        PhoneConfig {
            phone_id: "aa_bb_nexus4".to_string(),
            serial: "SERIAL1".to_string(),
            ip: "10.0.0.5".to_string(),
            sut_cmd_port: 20701,
            machine_type: "nexus4".to_string(),
            os_version: "6.0".to_string(),
        }
    }

    fn job() -> Job {
        Job {
            build_url: "http://x/build.zip".to_string(),
            build_date: 1_700_000_000,
            revision: "abc123".to_string(),
            android_proc_name: "org.mozilla.fennec".to_string(),
            version: "56.0a1".to_string(),
            build_type: "opt".to_string(),
        }
    }

    fn fast_tuning() -> WorkerTuning {
        WorkerTuning {
            idle_probe_timeout: Duration::from_millis(30),
            inter_test_sleep: Duration::from_millis(1),
            max_reboot_attempts: 3,
            max_reboot_wait: Duration::from_millis(20),
            reboot_probe_interval: Duration::from_millis(5),
        }
    }

    fn spawn_test_worker(
        driver: Arc<FakeDeviceDriver>,
        plugins: Vec<Arc<dyn TestPlugin>>,
    ) -> (PhoneWorkerHandle, JoinHandle<()>, mpsc::Receiver<StatusMessage>) {
        let (status_tx, status_rx) = mpsc::channel(STATUS_QUEUE_CAPACITY);
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn(PhoneWorkerParams {
            phone: phone(),
            tuning: fast_tuning(),
            driver,
            plugins,
            notifier: None,
            clock: Arc::new(FakeClock::new(1_700_000_000)),
            status_tx,
            log_path: dir.path().join("w.log"),
            callback_ip: "10.0.0.1".to_string(),
            callback_port: 30001,
        });
        (handle, join, status_rx)
    }

    #[tokio::test]
    async fn idle_to_disconnected_on_failed_probe() {
        let driver = Arc::new(FakeDeviceDriver::default());
        driver.set_shell_probe(false);
        let (handle, join, mut status_rx) = spawn_test_worker(driver, Vec::new());

        let msg = status_rx.recv().await.unwrap();
        assert_eq!(msg.state, WorkerState::Disconnected);

        handle.stop();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn successful_job_runs_install_then_test() {
        let driver = Arc::new(FakeDeviceDriver::default());
        let plugin: Arc<dyn TestPlugin> = Arc::new(FakeTestPlugin::new("smoketest"));
        let (handle, join, mut status_rx) = spawn_test_worker(driver.clone(), vec![plugin]);

        handle.add_job(job());

        let installing = status_rx.recv().await.unwrap();
        assert_eq!(installing.state, WorkerState::Installing);
        let testing = status_rx.recv().await.unwrap();
        assert_eq!(testing.state, WorkerState::Testing);

        handle.stop();
        join.await.unwrap();

        assert!(driver
            .call_log()
            .iter()
            .any(|c| matches!(c, autophone_adapters::DriverCall::InstallBuild { .. })));
    }

    #[tokio::test]
    async fn disabled_worker_queues_jobs_to_skipped() {
        let driver = Arc::new(FakeDeviceDriver::default());
        let plugin = Arc::new(FakeTestPlugin::new("smoketest"));
        plugin.set_result(Err("throws".to_string()));
        let (status_tx, mut status_rx) = mpsc::channel(STATUS_QUEUE_CAPACITY);
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn(PhoneWorkerParams {
            phone: phone(),
            tuning: fast_tuning(),
            driver: driver.clone(),
            plugins: vec![plugin.clone() as Arc<dyn TestPlugin>],
            notifier: None,
            clock: Arc::new(FakeClock::new(1_700_000_000)),
            status_tx,
            log_path: dir.path().join("w.log"),
            callback_ip: "10.0.0.1".to_string(),
            callback_port: 30001,
        });

        driver.set_sut_socket_opens(false);
        handle.add_job(job());

        // Drain statuses until DISABLED appears; DISCONNECTED must have
        // preceded it per the TESTING -> DISCONNECTED -> DISABLED give-up
        // transition.
        let mut saw_disconnected = false;
        let mut saw_disabled = false;
        for _ in 0..32 {
            if let Some(msg) = status_rx.recv().await {
                if msg.state == WorkerState::Disconnected {
                    saw_disconnected = true;
                }
                if msg.state == WorkerState::Disabled {
                    saw_disabled = true;
                    break;
                }
            } else {
                break;
            }
        }
        assert!(saw_disconnected);
        assert!(saw_disabled);

        handle.add_job(job());
        handle.stop();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn explicit_reboot_emits_rebooting_then_idle_with_detail() {
        let driver = Arc::new(FakeDeviceDriver::default());
        let (handle, join, mut status_rx) = spawn_test_worker(driver, Vec::new());

        handle.reboot();
        let rebooting = status_rx.recv().await.unwrap();
        assert_eq!(rebooting.state, WorkerState::Rebooting);
        let idle = status_rx.recv().await.unwrap();
        assert_eq!(idle.state, WorkerState::Idle);
        assert_eq!(idle.detail.as_deref(), Some("phone reset"));

        handle.stop();
        join.await.unwrap();
    }

    #[tokio::test]
    async fn recovery_runs_on_the_final_attempt_too_before_giving_up_on_the_test() {
        let driver = Arc::new(FakeDeviceDriver::default());
        let plugin = Arc::new(FakeTestPlugin::new("smoketest"));
        plugin.set_result(Err("throws".to_string()));
        let (handle, join, mut status_rx) =
            spawn_test_worker(driver.clone(), vec![plugin.clone() as Arc<dyn TestPlugin>]);

        handle.add_job(job());

        let mut states = Vec::new();
        for _ in 0..8 {
            match status_rx.recv().await {
                Some(msg) => {
                    let state = msg.state;
                    states.push(state);
                    if state == WorkerState::Disconnected {
                        break;
                    }
                }
                None => break,
            }
        }

        handle.stop();
        join.await.unwrap();

        // Both the first and the second (final) attempt throw, so recovery
        // runs twice (REBOOTING -> TESTING each time) and the worker is never
        // disabled — only recovery's own give-up disables the phone.
        assert!(!states.contains(&WorkerState::Disconnected));
        assert_eq!(
            states
                .iter()
                .filter(|s| **s == WorkerState::Rebooting)
                .count(),
            2
        );
        assert_eq!(
            driver
                .call_log()
                .iter()
                .filter(|c| matches!(c, autophone_adapters::DriverCall::RebootAdb { .. }))
                .count(),
            2
        );
    }
}
