// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build event bus collaborator (§6 "Build notifications"). New builds are
//! delivered as events the coordinator filters to the trees/platforms it
//! cares about before dispatching jobs.

use crate::error::BusError;
use async_trait::async_trait;

/// One build-available notification. Events missing `build_url` are
/// produced by upstream systems for builds that never finished packaging;
/// §6 says to drop them silently rather than dispatch a broken job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEvent {
    pub build_url: Option<String>,
    pub build_date: u64,
    pub tree: String,
    pub platform: String,
    pub build_type: String,
}

impl BuildEvent {
    /// Whether this event matches the fixed dispatch filter: `mozilla-central`
    /// / `android` / `opt` (§6). Other trees/platforms/build types are
    /// real events, just not ones AutoPhone tests.
    pub fn is_dispatchable(&self) -> bool {
        self.build_url.is_some()
            && self.tree == "mozilla-central"
            && self.platform == "android"
            && self.build_type == "opt"
    }
}

/// Subscribes to upstream build notifications.
#[async_trait]
pub trait BuildEventBus: Send + Sync + 'static {
    /// Block until the next event arrives, or the bus is closed.
    async fn next_event(&self) -> Result<BuildEvent, BusError>;
}

/// In-process fake bus for tests: events are pushed ahead of time and
/// replayed in order.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeBuildEventBus {
    events: tokio::sync::Mutex<std::collections::VecDeque<BuildEvent>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeBuildEventBus {
    pub fn new(events: Vec<BuildEvent>) -> Self {
        Self {
            events: tokio::sync::Mutex::new(events.into()),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl BuildEventBus for FakeBuildEventBus {
    async fn next_event(&self) -> Result<BuildEvent, BusError> {
        self.events.lock().await.pop_front().ok_or(BusError::Closed)
    }
}
