// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phone registration and job data (§3).

use serde::{Deserialize, Serialize};

/// Immutable phone registration, keyed by [`crate::PhoneId`] (embedded as
/// `phone_id` for easy (de)serialization into the fleet cache JSON shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneConfig {
    pub phone_id: String,
    pub serial: String,
    pub ip: String,
    pub sut_cmd_port: u16,
    pub machine_type: String,
    pub os_version: String,
}

/// A single test run request, created by the Dispatcher and consumed once
/// per worker. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub build_url: String,
    pub build_date: u64,
    pub revision: String,
    pub android_proc_name: String,
    pub version: String,
    pub build_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_config_json_roundtrip() {
        let cfg = PhoneConfig {
            phone_id: "aa_bb_01_nexus4".to_string(),
            serial: "SERIAL1".to_string(),
            ip: "10.0.0.5".to_string(),
            sut_cmd_port: 20701,
            machine_type: "nexus4".to_string(),
            os_version: "4.4".to_string(),
        };
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: PhoneConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(cfg, back);
    }

    #[test]
    fn job_is_immutable_value_type() {
        let job = Job {
            build_url: "http://x/foo.apk".to_string(),
            build_date: 1_700_000_000,
            revision: "deadbeef".to_string(),
            android_proc_name: "org.mozilla.fennec".to_string(),
            version: "1.0".to_string(),
            build_type: "opt".to_string(),
        };
        let cloned = job.clone();
        assert_eq!(job, cloned);
    }
}
