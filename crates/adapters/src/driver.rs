// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device Driver collaborator (§6): reboot, probe liveness, install build,
//! open the SUT control socket. The real implementation shells out to an
//! ADB-equivalent tool and talks to the on-device SUT agent over TCP; tests
//! substitute [`FakeDeviceDriver`].

use crate::error::DriverError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Required operations of the on-device control transport (§6).
#[async_trait]
pub trait DeviceDriver: Send + Sync + 'static {
    /// Reboot the phone over the USB-attached control channel.
    async fn reboot_adb(&self, serial: &str) -> Result<(), DriverError>;

    /// Cheap liveness probe: does a shell-level command succeed?
    async fn shell_probe(&self, serial: &str) -> bool;

    /// Download and install `url` as `proc_name` on `serial`, uninstalling
    /// the named process first if present. Returns whether install
    /// succeeded; never panics on a failed install (§7 policy: log and
    /// continue).
    async fn install_build(
        &self,
        phone_id: &str,
        url: &str,
        proc_name: &str,
        serial: &str,
    ) -> Result<(), DriverError>;

    /// Whether the on-device SUT agent answers at `ip:port` (recovery probe).
    async fn sut_socket_opens(&self, ip: &str, port: u16) -> bool;

    /// Trigger a reboot through the on-device SUT agent, which re-registers
    /// via the `register` command once back up.
    async fn sut_reboot(
        &self,
        ip: &str,
        port: u16,
        callback_ip: &str,
        callback_port: u16,
    ) -> Result<(), DriverError>;
}

/// ADB-equivalent driver, shelling out to a configurable `adb`-like binary
/// and speaking a minimal line protocol to the on-device SUT agent.
pub struct RealDeviceDriver {
    adb_binary: String,
    connect_timeout: Duration,
}

impl RealDeviceDriver {
    pub fn new(adb_binary: impl Into<String>) -> Self {
        Self {
            adb_binary: adb_binary.into(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for RealDeviceDriver {
    fn default() -> Self {
        Self::new("adb")
    }
}

#[async_trait]
impl DeviceDriver for RealDeviceDriver {
    async fn reboot_adb(&self, serial: &str) -> Result<(), DriverError> {
        let output = Command::new(&self.adb_binary)
            .args(["-s", serial, "reboot"])
            .output()
            .await
            .map_err(|e| DriverError::Reboot {
                serial: serial.to_string(),
                message: e.to_string(),
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(DriverError::Reboot {
                serial: serial.to_string(),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }

    async fn shell_probe(&self, serial: &str) -> bool {
        Command::new(&self.adb_binary)
            .args(["-s", serial, "shell", "ps"])
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    async fn install_build(
        &self,
        phone_id: &str,
        url: &str,
        proc_name: &str,
        serial: &str,
    ) -> Result<(), DriverError> {
        if !proc_name.is_empty() {
            // Best-effort: the process may not be installed yet.
            let _ = Command::new(&self.adb_binary)
                .args(["-s", serial, "uninstall", proc_name])
                .output()
                .await;
        }

        let apk_path = crate::download::fetch_to_tempfile(url)
            .await
            .map_err(|e| DriverError::Install {
                phone_id: phone_id.to_string(),
                message: e.to_string(),
            })?;

        let output = Command::new(&self.adb_binary)
            .args(["-s", serial, "install", "-r"])
            .arg(&apk_path)
            .output()
            .await
            .map_err(|e| DriverError::Install {
                phone_id: phone_id.to_string(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(DriverError::Install {
                phone_id: phone_id.to_string(),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }

    async fn sut_socket_opens(&self, ip: &str, port: u16) -> bool {
        tokio::time::timeout(
            self.connect_timeout,
            tokio::net::TcpStream::connect((ip, port)),
        )
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
    }

    async fn sut_reboot(
        &self,
        ip: &str,
        port: u16,
        callback_ip: &str,
        callback_port: u16,
    ) -> Result<(), DriverError> {
        use tokio::io::AsyncWriteExt;

        let mut stream = tokio::time::timeout(
            self.connect_timeout,
            tokio::net::TcpStream::connect((ip, port)),
        )
        .await
        .map_err(|_| DriverError::SutReboot {
            ip: ip.to_string(),
            port,
            message: "connect timed out".to_string(),
        })?
        .map_err(|e| DriverError::SutReboot {
            ip: ip.to_string(),
            port,
            message: e.to_string(),
        })?;

        let cmd = format!("rebt {callback_ip} {callback_port}\n");
        stream
            .write_all(cmd.as_bytes())
            .await
            .map_err(|e| DriverError::SutReboot {
                ip: ip.to_string(),
                port,
                message: e.to_string(),
            })
    }
}

/// Recorded call against [`FakeDeviceDriver`], for assertions in tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    RebootAdb { serial: String },
    ShellProbe { serial: String },
    InstallBuild { phone_id: String, url: String },
    SutSocketOpens { ip: String, port: u16 },
    SutReboot { ip: String, port: u16 },
}

/// Scriptable fake driver for tests. Configure canned responses, then assert
/// on the recorded [`DriverCall`] history.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeDeviceDriver {
    pub calls: parking_lot::Mutex<Vec<DriverCall>>,
    pub shell_probe_result: parking_lot::Mutex<bool>,
    pub install_result: parking_lot::Mutex<Result<(), String>>,
    pub sut_socket_opens_result: parking_lot::Mutex<bool>,
    pub reboot_result: parking_lot::Mutex<Result<(), String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeDeviceDriver {
    fn default() -> Self {
        Self {
            calls: parking_lot::Mutex::new(Vec::new()),
            shell_probe_result: parking_lot::Mutex::new(true),
            install_result: parking_lot::Mutex::new(Ok(())),
            sut_socket_opens_result: parking_lot::Mutex::new(true),
            reboot_result: parking_lot::Mutex::new(Ok(())),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl FakeDeviceDriver {
    pub fn set_shell_probe(&self, value: bool) {
        *self.shell_probe_result.lock() = value;
    }

    pub fn set_install_result(&self, value: Result<(), String>) {
        *self.install_result.lock() = value;
    }

    pub fn set_sut_socket_opens(&self, value: bool) {
        *self.sut_socket_opens_result.lock() = value;
    }

    pub fn set_reboot_result(&self, value: Result<(), String>) {
        *self.reboot_result.lock() = value;
    }

    pub fn call_log(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl DeviceDriver for FakeDeviceDriver {
    async fn reboot_adb(&self, serial: &str) -> Result<(), DriverError> {
        self.calls.lock().push(DriverCall::RebootAdb {
            serial: serial.to_string(),
        });
        self.reboot_result
            .lock()
            .clone()
            .map_err(|message| DriverError::Reboot {
                serial: serial.to_string(),
                message,
            })
    }

    async fn shell_probe(&self, serial: &str) -> bool {
        self.calls.lock().push(DriverCall::ShellProbe {
            serial: serial.to_string(),
        });
        *self.shell_probe_result.lock()
    }

    async fn install_build(
        &self,
        phone_id: &str,
        url: &str,
        _proc_name: &str,
        _serial: &str,
    ) -> Result<(), DriverError> {
        self.calls.lock().push(DriverCall::InstallBuild {
            phone_id: phone_id.to_string(),
            url: url.to_string(),
        });
        self.install_result
            .lock()
            .clone()
            .map_err(|message| DriverError::Install {
                phone_id: phone_id.to_string(),
                message,
            })
    }

    async fn sut_socket_opens(&self, ip: &str, port: u16) -> bool {
        self.calls.lock().push(DriverCall::SutSocketOpens {
            ip: ip.to_string(),
            port,
        });
        *self.sut_socket_opens_result.lock()
    }

    async fn sut_reboot(
        &self,
        ip: &str,
        port: u16,
        _callback_ip: &str,
        _callback_port: u16,
    ) -> Result<(), DriverError> {
        self.calls.lock().push(DriverCall::SutReboot {
            ip: ip.to_string(),
            port,
        });
        self.reboot_result
            .lock()
            .clone()
            .map_err(|message| DriverError::SutReboot {
                ip: ip.to_string(),
                port,
                message,
            })
    }
}
