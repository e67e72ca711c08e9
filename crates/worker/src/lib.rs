// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Phone Worker (§4.D): per-device supervised task, job execution, and
//! the reboot-and-probe recovery protocol.

pub mod phone_worker;
pub mod recovery;
pub mod worker_log;

pub use phone_worker::{spawn, PhoneWorkerHandle, PhoneWorkerParams};
pub use recovery::{recover, RecoveryOutcome};
