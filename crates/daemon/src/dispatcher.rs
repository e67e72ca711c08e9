// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher (§4.F): turns a build event or an operator's `triggerjobs`
//! command into a [`Job`] and broadcasts it to every registered worker.

use crate::ctx::DaemonCtx;
use crate::error::CommandError;
use autophone_adapters::BuildEvent;
use autophone_core::Job;
use std::sync::Arc;

/// Repository → process-name mapping (§4.F), spec.md's bare-name table.
fn proc_name_for_repository(repository: &str) -> &'static str {
    match repository {
        "mozilla-central" => "org.mozilla.fennec",
        "mozilla-aurora" => "org.mozilla.fennec_aurora",
        "mozilla-beta" => "org.mozilla.firefox",
        _ => "",
    }
}

/// Handles a build-available event from the build-event bus: fetches the
/// artifact, extracts `application.ini`, and dispatches a job if the event
/// carries a usable build URL. Events failing `is_dispatchable()` (no URL,
/// wrong tree/platform/build type) are dropped silently, matching §6's "drop
/// rather than dispatch a broken job".
pub async fn on_build(ctx: &Arc<DaemonCtx>, event: BuildEvent) {
    if !event.is_dispatchable() {
        return;
    }
    let Some(build_url) = event.build_url.clone() else {
        return;
    };

    let app_ini = match ctx.downloader.fetch_app_ini(&build_url).await {
        Ok(app_ini) => app_ini,
        Err(e) => {
            tracing::error!(build_url, error = %e, "failed to fetch build artifact, dropping event");
            return;
        }
    };

    let job = Job {
        build_url,
        build_date: event.build_date,
        revision: app_ini.source_stamp,
        android_proc_name: proc_name_for_repository(&app_ini.source_repository).to_string(),
        version: app_ini.version,
        build_type: event.build_type,
    };
    start_tests(ctx, job);
}

/// Handles an operator `triggerjobs` command: parses `k=v,k=v,...`,
/// requires `buildurl`, and dispatches directly without going through the
/// build-event bus or artifact fetch (§4.F entry point 2).
pub fn trigger_jobs(ctx: &Arc<DaemonCtx>, params: &str) -> Result<(), CommandError> {
    let mut fields = std::collections::HashMap::new();
    for pair in params.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (k, v) = pair
            .split_once('=')
            .ok_or_else(|| CommandError::MalformedPair(pair.to_string()))?;
        fields.insert(k.to_string(), v.to_string());
    }

    let build_url = fields
        .get("buildurl")
        .cloned()
        .ok_or(CommandError::MissingField("buildurl"))?;

    let job = Job {
        build_url,
        build_date: fields.get("blddate").and_then(|s| s.parse().ok()).unwrap_or(0),
        revision: fields.get("revision").cloned().unwrap_or_default(),
        android_proc_name: fields.get("procname").cloned().unwrap_or_default(),
        version: fields.get("version").cloned().unwrap_or_default(),
        build_type: fields.get("buildtype").cloned().unwrap_or_else(|| "opt".to_string()),
    };
    start_tests(ctx, job);
    Ok(())
}

/// Acquires the fleet lock and enqueues `job` to every registered worker.
/// Policy: broadcast, not load-balance (§4.F).
pub fn start_tests(ctx: &Arc<DaemonCtx>, job: Job) {
    let fleet = ctx.fleet.lock();
    for entry in fleet.values() {
        entry.handle.add_job(job.clone());
    }
}
