// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status Aggregator (§4.G): the single consumer of worker status messages
//! and the sole authority on worker-visible state (§9 "Cross-process
//! state" Design Note). The `status` command reads exclusively from
//! [`DaemonCtx::views`]; nothing else ever writes to it.

use crate::ctx::DaemonCtx;
use autophone_core::StatusMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Suspension-point timeout for the aggregator's channel receive (§5): the
/// coordinator "may block only in `status_channel.take(timeout=5s)`".
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs until `status_rx` is closed (every worker has shut down and been
/// dropped), folding each message into its `WorkerView` and logging it at
/// INFO (§4.G).
pub async fn run(ctx: Arc<DaemonCtx>, mut status_rx: mpsc::Receiver<StatusMessage>) {
    loop {
        match tokio::time::timeout(RECV_TIMEOUT, status_rx.recv()).await {
            Ok(Some(msg)) => observe(&ctx, msg),
            Ok(None) => break,
            Err(_elapsed) => continue,
        }
    }
}

fn observe(ctx: &Arc<DaemonCtx>, msg: StatusMessage) {
    tracing::info!(
        phone_id = %msg.phone_id,
        state = %msg.state,
        build = ?msg.build,
        detail = ?msg.detail,
        "worker status"
    );
    let mut views = ctx.views.lock();
    views.entry(msg.phone_id.clone()).or_default().observe(msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use autophone_core::WorkerState;

    #[tokio::test]
    async fn folds_messages_into_per_phone_views() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = crate::test_support::test_ctx(dir.path());
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(run(ctx.clone(), rx));

        tx.send(StatusMessage::new("p1", WorkerState::Idle, 1)).await.unwrap();
        tx.send(StatusMessage::new("p1", WorkerState::Installing, 2)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let views = ctx.views.lock();
        let view = views.get("p1").unwrap();
        assert_eq!(view.last.as_ref().unwrap().state, WorkerState::Installing);
        assert_eq!(view.last_of_previous_type.as_ref().unwrap().state, WorkerState::Idle);
        assert!(view.is_consistent());
    }
}
