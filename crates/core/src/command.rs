// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands enqueued onto a worker's inbound command queue (§3).

use crate::job::Job;

/// Message sent from the coordinator to a single worker's command queue.
///
/// `Shutdown` is a sentinel that closes the queue; it is never observed by
/// worker business logic beyond the main loop's `select`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    Job(Job),
    Reboot,
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_command_carries_the_job_by_value() {
        let job = Job {
            build_url: "http://x/foo.apk".to_string(),
            build_date: 1,
            revision: "r".to_string(),
            android_proc_name: "p".to_string(),
            version: "v".to_string(),
            build_type: "opt".to_string(),
        };
        let cmd = WorkerCommand::Job(job.clone());
        assert_eq!(cmd, WorkerCommand::Job(job));
    }
}
