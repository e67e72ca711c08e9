// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn phone(id: &str) -> PhoneConfig {
    PhoneConfig {
        phone_id: id.to_string(),
        serial: "SERIAL1".to_string(),
        ip: "10.0.0.5".to_string(),
        sut_cmd_port: 20701,
        machine_type: "nexus4".to_string(),
        os_version: "4.4".to_string(),
    }
}

#[test]
fn missing_file_loads_as_empty_fleet() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cache.json");
    let cache = FleetCache::load(&path).expect("load");
    assert!(cache.phones.is_empty());
}

#[test]
fn empty_file_loads_as_empty_fleet() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cache.json");
    std::fs::write(&path, b"").expect("write");
    let cache = FleetCache::load(&path).expect("load");
    assert!(cache.phones.is_empty());
}

#[test]
fn garbled_json_loads_as_empty_fleet() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cache.json");
    std::fs::write(&path, b"{not json").expect("write");
    let cache = FleetCache::load(&path).expect("load");
    assert!(cache.phones.is_empty());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cache.json");

    let mut cache = FleetCache::default();
    cache.upsert(phone("aa_bb_01_nexus4"));
    cache.save(&path).expect("save");

    let loaded = FleetCache::load(&path).expect("load");
    assert_eq!(loaded, cache);
}

#[test]
fn upsert_is_idempotent_by_phone_id() {
    let mut cache = FleetCache::default();
    cache.upsert(phone("p1"));
    cache.upsert(phone("p1"));
    assert_eq!(cache.phones.len(), 1);
}

#[test]
fn upsert_existing_updates_fields_in_place() {
    let mut cache = FleetCache::default();
    cache.upsert(phone("p1"));
    let mut updated = phone("p1");
    updated.ip = "10.0.0.9".to_string();
    cache.upsert(updated);

    assert_eq!(cache.phones.len(), 1);
    assert_eq!(cache.phones[0].ip, "10.0.0.9");
}

#[test]
fn save_does_not_leave_temp_file_behind() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cache.json");
    let mut cache = FleetCache::default();
    cache.upsert(phone("p1"));
    cache.save(&path).expect("save");

    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());
}
