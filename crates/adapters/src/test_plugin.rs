// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-plugin collaborator (§6 "Test plugins"). A plugin runs one suite
//! against an installed build; its outcome is reported explicitly rather
//! than inferred from a raised exception (§9 REDESIGN FLAG "Exception-driven
//! control").

use crate::error::TestPluginError;
use async_trait::async_trait;
use autophone_core::{Job, PhoneConfig};

/// One test suite runnable against an installed build.
#[async_trait]
pub trait TestPlugin: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Run the suite against `job` on `phone`. `Ok(())` means the suite
    /// completed and reported its own pass/fail via its own channel (logs,
    /// result files); this return only distinguishes "ran to completion"
    /// from "could not run" (crash, timeout, missing fixture).
    async fn run(&self, job: &Job, phone: &PhoneConfig) -> Result<(), TestPluginError>;
}

/// One `[plugin]` section of the manifest: a suite name and the shell
/// command that runs it, if any. A section with no `command` key names a
/// suite with no runnable implementation yet — reported by name but never
/// invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginManifestEntry {
    pub name: String,
    pub command: Option<String>,
}

/// Loads the manifest of enabled test plugins named by `--test-path`
/// (default `tests/manifest.ini`, one `[plugin]` section per suite with a
/// `name` key and an optional `command` key).
pub fn load_manifest(path: &std::path::Path) -> Result<Vec<PluginManifestEntry>, TestPluginError> {
    let conf = ini::Ini::load_from_file(path).map_err(|e| TestPluginError::ManifestLoad {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut entries = Vec::new();
    for (section, props) in conf.iter() {
        if section != Some("plugin") {
            continue;
        }
        if let Some(name) = props.get("name") {
            entries.push(PluginManifestEntry {
                name: name.to_string(),
                command: props.get("command").map(str::to_string),
            });
        }
    }
    Ok(entries)
}

/// Runs a suite by shelling out to its manifest `command`, substituting
/// `{build_url}`, `{revision}`, `{phone_id}`, `{serial}`, and `{ip}` tokens.
/// Grounded on the same `tokio::process::Command` shape the Device Driver
/// uses to shell out to `adb`.
pub struct ShellTestPlugin {
    name: String,
    command: String,
}

impl ShellTestPlugin {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }

    fn render_command(&self, job: &Job, phone: &PhoneConfig) -> String {
        self.command
            .replace("{build_url}", &job.build_url)
            .replace("{revision}", &job.revision)
            .replace("{phone_id}", &phone.phone_id)
            .replace("{serial}", &phone.serial)
            .replace("{ip}", &phone.ip)
    }
}

#[async_trait]
impl TestPlugin for ShellTestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, job: &Job, phone: &PhoneConfig) -> Result<(), TestPluginError> {
        let rendered = self.render_command(job, phone);
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&rendered)
            .output()
            .await
            .map_err(|e| TestPluginError::TestThrew {
                name: self.name.clone(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(TestPluginError::TestThrew {
                name: self.name.clone(),
                message: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

/// Fake plugin for tests: records invocations and returns a canned result.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeTestPlugin {
    pub name: String,
    pub result: parking_lot::Mutex<Result<(), String>>,
    pub runs: parking_lot::Mutex<Vec<(String, String)>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeTestPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: parking_lot::Mutex::new(Ok(())),
            runs: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn set_result(&self, result: Result<(), String>) {
        *self.result.lock() = result;
    }

    pub fn run_log(&self) -> Vec<(String, String)> {
        self.runs.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl TestPlugin for FakeTestPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, job: &Job, phone: &PhoneConfig) -> Result<(), TestPluginError> {
        self.runs
            .lock()
            .push((job.revision.clone(), phone.phone_id.clone()));
        self.result
            .lock()
            .clone()
            .map_err(|message| TestPluginError::TestThrew {
                name: self.name.clone(),
                message,
            })
    }
}
