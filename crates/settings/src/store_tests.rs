// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::TempDir;
use yare::parameterized;

fn seeded_store(dir: &TempDir) -> SettingsStore {
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        serde_json::to_vec_pretty(&json!({
            "global": {
                "nats_url": "nats://localhost:4222",
                "port": 4000,
                "sensors": ["gps", "can"]
            },
            "dummy_service": { "update_interval": 5 }
        }))
        .unwrap(),
    )
    .unwrap();
    SettingsStore::open(path)
}

fn reload(store: &SettingsStore) -> Value {
    serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap()
}

#[test]
fn open_missing_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let store = SettingsStore::open(dir.path().join("absent.json"));
    assert_eq!(store.tree(), &json!({}));
}

#[test]
fn open_corrupt_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, b"{ not json").unwrap();
    let store = SettingsStore::open(path);
    assert_eq!(store.tree(), &json!({}));
}

#[test]
fn subtree_returns_top_level_key_or_empty() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    assert_eq!(store.subtree("dummy_service"), json!({"update_interval": 5}));
    assert_eq!(store.subtree("gps_service"), json!({}));
}

#[parameterized(
    integer = { "42", json!(42) },
    negative = { "-7", json!(-7) },
    float = { "3.14", json!(3.14) },
    text = { "hello", json!("hello") },
    boolish_text_stays_text = { "true", json!("true") },
)]
fn update_scalar_coerces_strings(raw: &str, expected: Value) {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    let effective = store
        .update_scalar("global.nats_url", &Value::from(raw))
        .unwrap();
    assert_eq!(effective, expected);
    assert_eq!(reload(&store)["global"]["nats_url"], expected);
}

#[test]
fn update_scalar_keeps_non_string_values_as_given() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    let effective = store.update_scalar("global.port", &json!(8000)).unwrap();
    assert_eq!(effective, json!(8000));
}

#[test]
fn update_scalar_addresses_list_elements_by_index() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    store
        .update_scalar("global.sensors.1", &Value::from("imu"))
        .unwrap();
    assert_eq!(reload(&store)["global"]["sensors"], json!(["gps", "imu"]));
}

#[test]
fn update_scalar_rejects_subtree_targets() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    let err = store
        .update_scalar("global", &Value::from("oops"))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotScalar(_)), "got: {err:?}");
    // Nothing changed on disk.
    assert_eq!(reload(&store)["global"]["port"], json!(4000));
}

#[test]
fn update_scalar_rejects_missing_paths() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    let err = store
        .update_scalar("global.does.not.exist", &Value::from("1"))
        .unwrap_err();
    assert!(matches!(err, StoreError::NoSuchPath(_)), "got: {err:?}");
}

#[test]
fn update_scalar_rejects_bad_list_index() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    let err = store
        .update_scalar("global.sensors.9", &Value::from("x"))
        .unwrap_err();
    assert!(matches!(err, StoreError::BadIndex { .. }), "got: {err:?}");
}

#[test]
fn update_block_replaces_whole_subtree() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    store
        .update_block("dummy_service", json!({"update_interval": 1, "enabled": true}))
        .unwrap();
    assert_eq!(
        reload(&store)["dummy_service"],
        json!({"update_interval": 1, "enabled": true})
    );
}

#[test]
fn update_block_creates_missing_parents() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    store
        .update_block("gps_service.serial.baud", json!(115200))
        .unwrap();
    assert_eq!(reload(&store)["gps_service"]["serial"]["baud"], json!(115200));
}

#[test]
fn import_backs_up_the_previous_file() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    store.import(json!({"global": {"nats_url": "nats://new:4222"}})).unwrap();

    assert_eq!(reload(&store)["global"]["nats_url"], json!("nats://new:4222"));
    let backups: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("settings.json.") && n.ends_with(".bak"))
        .collect();
    assert_eq!(backups.len(), 1, "expected one backup, got {backups:?}");
}

#[test]
fn import_accepts_json_encoded_string() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    store
        .import(Value::from(r#"{"global":{"port":1}}"#))
        .unwrap();
    assert_eq!(reload(&store)["global"]["port"], json!(1));
}

#[test]
fn load_from_file_reads_sibling_configs_only() {
    let dir = TempDir::new().unwrap();
    let mut store = seeded_store(&dir);
    fs::write(
        dir.path().join("field_test.json"),
        serde_json::to_vec(&json!({"global": {"port": 9}})).unwrap(),
    )
    .unwrap();

    store.load_from_file("field_test.json").unwrap();
    assert_eq!(store.tree()["global"]["port"], json!(9));

    assert!(matches!(
        store.load_from_file("../escape.json"),
        Err(StoreError::InvalidFilename(_))
    ));
    assert!(matches!(
        store.load_from_file("notes.txt"),
        Err(StoreError::InvalidFilename(_))
    ));
    assert!(matches!(
        store.load_from_file("/etc/passwd.json"),
        Err(StoreError::InvalidFilename(_))
    ));
}

#[test]
fn list_configs_names_json_files_sorted() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    fs::write(dir.path().join("b_profile.json"), b"{}").unwrap();
    fs::write(dir.path().join("a_profile.json"), b"{}").unwrap();
    fs::write(dir.path().join("readme.txt"), b"x").unwrap();

    assert_eq!(
        store.list_configs().unwrap(),
        vec![
            "a_profile.json".to_string(),
            "b_profile.json".to_string(),
            "settings.json".to_string()
        ]
    );
}
