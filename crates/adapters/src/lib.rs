// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! External collaborators named in §6: the device driver, mailer, build
//! event bus, artifact downloader, and test-plugin loader. Their internal
//! workings are out of scope; only the narrow interfaces are specified.

pub mod bus;
pub mod download;
pub mod driver;
pub mod error;
pub mod mailer;
pub mod test_plugin;

pub use bus::{BuildEvent, BuildEventBus};
pub use download::{AppIni, Downloader};
pub use driver::DeviceDriver;
pub use error::{BusError, DownloadError, DriverError, MailError, TestPluginError};
pub use mailer::{MailTransport, Mailer, Notifier};
pub use test_plugin::{load_manifest, PluginManifestEntry, ShellTestPlugin, TestPlugin};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use bus::FakeBuildEventBus;
#[cfg(any(test, feature = "test-support"))]
pub use download::FakeDownloader;
#[cfg(any(test, feature = "test-support"))]
pub use driver::{DriverCall, FakeDeviceDriver};
#[cfg(any(test, feature = "test-support"))]
pub use mailer::{FakeMailTransport, SentMail};
#[cfg(any(test, feature = "test-support"))]
pub use test_plugin::FakeTestPlugin;
