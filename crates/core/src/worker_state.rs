// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-visible state machine (§4.D).

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single phone worker, as observed through its status channel.
///
/// Initial state is [`WorkerState::Idle`]; [`WorkerState::Disabled`] is
/// terminal and sticky for the lifetime of the worker's process/task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Installing,
    Testing,
    Rebooting,
    Disconnected,
    Disabled,
}

impl WorkerState {
    /// Whether a job running against this state should be abandoned to
    /// `skipped_jobs` instead of executed.
    pub fn is_disabled(self) -> bool {
        matches!(self, WorkerState::Disabled)
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        WorkerState::Idle
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Idle => "idle",
            WorkerState::Installing => "installing",
            WorkerState::Testing => "testing",
            WorkerState::Rebooting => "rebooting",
            WorkerState::Disconnected => "disconnected",
            WorkerState::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(WorkerState::default(), WorkerState::Idle);
    }

    #[test]
    fn only_disabled_is_disabled() {
        assert!(WorkerState::Disabled.is_disabled());
        assert!(!WorkerState::Disconnected.is_disabled());
        assert!(!WorkerState::Idle.is_disabled());
    }

    #[yare::parameterized(
        idle = { WorkerState::Idle, "idle" },
        installing = { WorkerState::Installing, "installing" },
        testing = { WorkerState::Testing, "testing" },
        rebooting = { WorkerState::Rebooting, "rebooting" },
        disconnected = { WorkerState::Disconnected, "disconnected" },
        disabled = { WorkerState::Disabled, "disabled" },
    )]
    fn display_is_lowercase_tag(state: WorkerState, expected: &str) {
        assert_eq!(state.to_string(), expected);
    }
}
