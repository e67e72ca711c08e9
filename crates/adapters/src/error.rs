// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for each external collaborator.

use thiserror::Error;

/// Errors from the Device Driver collaborator (§6).
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("reboot of {serial} failed: {message}")]
    Reboot { serial: String, message: String },
    #[error("install of build onto {phone_id} failed: {message}")]
    Install { phone_id: String, message: String },
    #[error("sut reboot of {ip}:{port} failed: {message}")]
    SutReboot {
        ip: String,
        port: u16,
        message: String,
    },
}

/// Errors sending mail (§6 "Email config").
#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to parse email config {path}: {message}")]
    ConfigParse { path: String, message: String },
    #[error("transport failed to send mail: {0}")]
    Transport(String),
}

/// Errors from the build-event bus collaborator.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("build event bus closed")]
    Closed,
}

/// Errors fetching/extracting a build artifact (§6 "Artifact format").
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("failed to extract application.ini: {0}")]
    Extract(String),
    #[error("application.ini missing required key [App] {0}")]
    MissingKey(String),
}

/// Errors from the test-plugin loader/runner collaborator.
#[derive(Debug, Error)]
pub enum TestPluginError {
    #[error("failed to load test manifest {path}: {message}")]
    ManifestLoad { path: String, message: String },
    #[error("test {name} threw: {message}")]
    TestThrew { name: String, message: String },
}
