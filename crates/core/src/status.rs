// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status messages emitted by workers and the aggregator's per-worker view (§3, §4.G).

use crate::worker_state::WorkerState;
use serde::{Deserialize, Serialize};

/// Immutable record emitted by a worker whenever its state changes or on
/// heartbeat. Crosses the worker/coordinator boundary by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub phone_id: String,
    pub state: WorkerState,
    pub timestamp_epoch_secs: u64,
    pub build: Option<u64>,
    pub detail: Option<String>,
}

impl StatusMessage {
    pub fn new(phone_id: impl Into<String>, state: WorkerState, timestamp_epoch_secs: u64) -> Self {
        Self {
            phone_id: phone_id.into(),
            state,
            timestamp_epoch_secs,
            build: None,
            detail: None,
        }
    }

    pub fn with_build(mut self, build: u64) -> Self {
        self.build = Some(build);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// One-line rendering used in `status` reports and logs.
    pub fn short_desc(&self) -> String {
        match (&self.build, &self.detail) {
            (Some(build), Some(detail)) => format!("{} (build={}, {})", self.state, build, detail),
            (Some(build), None) => format!("{} (build={})", self.state, build),
            (None, Some(detail)) => format!("{} ({})", self.state, detail),
            (None, None) => self.state.to_string(),
        }
    }
}

/// Per-worker view maintained by the Status Aggregator (§4.G).
///
/// Invariant: if `last` is `Some`, `first_of_current_type.state == last.state`,
/// and `last_of_previous_type.state != last.state` whenever it is `Some`.
#[derive(Debug, Clone, Default)]
pub struct WorkerView {
    pub last: Option<StatusMessage>,
    pub first_of_current_type: Option<StatusMessage>,
    pub last_of_previous_type: Option<StatusMessage>,
}

impl WorkerView {
    /// Fold a newly-received status message into the view, per §4.G:
    /// - if the state changed, the old `last` becomes `last_of_previous_type`
    ///   and `msg` becomes `first_of_current_type`;
    /// - `last` is always updated to `msg`.
    pub fn observe(&mut self, msg: StatusMessage) {
        let state_changed = self
            .last
            .as_ref()
            .map(|last| last.state != msg.state)
            .unwrap_or(true);
        if state_changed {
            self.last_of_previous_type = self.last.take();
            self.first_of_current_type = Some(msg.clone());
        }
        self.last = Some(msg);
    }

    /// Check the invariant documented on the struct. Used by tests and
    /// debug assertions at call sites that mutate the view directly.
    pub fn is_consistent(&self) -> bool {
        match (&self.last, &self.first_of_current_type, &self.last_of_previous_type) {
            (None, _, _) => true,
            (Some(last), Some(first), Some(prev)) => {
                first.state == last.state && prev.state != last.state
            }
            (Some(last), Some(first), None) => first.state == last.state,
            (Some(_), None, _) => false,
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
