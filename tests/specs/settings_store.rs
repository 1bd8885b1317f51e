// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings round trips over the bus.

use crate::prelude::*;
use ds_bus::{BusClient, MemoryBus};
use serde_json::json;
use std::time::Duration;

fn base_doc() -> serde_json::Value {
    json!({
        "global": { "nats_url": "nats://localhost:4222", "port": 4000 }
    })
}

#[tokio::test]
async fn coercion_lands_on_disk_and_in_the_broadcast() {
    let bus = MemoryBus::new();
    let (_settings, _dir, path) = start_settings_service(&bus, base_doc()).await;
    let mut updates = bus.subscribe("settings.updated").await.unwrap();

    command_ok(
        &bus,
        "commands.settings_service",
        r#"{"command":"update_setting","key":"global.port","value":"8000"}"#,
    )
    .await;

    // The broadcast carries the effective post-coercion value.
    let broadcast = updates.recv().await.unwrap();
    let update: serde_json::Value = serde_json::from_slice(&broadcast.payload).unwrap();
    assert_eq!(update["key"], json!("global.port"));
    assert_eq!(update["value"], json!(8000));

    // The document on disk holds the integer, not the string.
    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk["global"]["port"], json!(8000));
}

#[tokio::test]
async fn updated_values_are_served_to_readers() {
    let bus = MemoryBus::new();
    let (_settings, _dir, _path) = start_settings_service(&bus, base_doc()).await;

    command_ok(
        &bus,
        "commands.settings_service",
        r#"{"command":"update_setting_block","key":"gps_service","value":{"baud":115200}}"#,
    )
    .await;

    let resp = bus
        .request("settings.get.gps_service", b"", Duration::from_millis(1000))
        .await
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&resp.payload).unwrap();
    assert_eq!(doc, json!({"baud": 115200}));

    let resp = bus
        .request("settings.get.all", b"", Duration::from_millis(1000))
        .await
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&resp.payload).unwrap();
    assert_eq!(doc["gps_service"]["baud"], json!(115200));
}

#[tokio::test]
async fn import_backs_up_and_reloads() {
    let bus = MemoryBus::new();
    let (_settings, dir, path) = start_settings_service(&bus, base_doc()).await;
    let mut reloads = bus.subscribe("settings.reloaded").await.unwrap();

    command_ok(
        &bus,
        "commands.settings_service",
        r#"{"command":"import_settings","data":{"global":{"port":1}}}"#,
    )
    .await;

    assert!(reloads.recv().await.unwrap().payload.is_empty());

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({"global": {"port": 1}}));

    let backups = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
        .count();
    assert_eq!(backups, 1);
}

#[tokio::test]
async fn list_configs_round_trip() {
    let bus = MemoryBus::new();
    let (_settings, dir, _path) = start_settings_service(&bus, base_doc()).await;
    std::fs::write(dir.path().join("field_test.json"), b"{}").unwrap();

    let resp = bus
        .request("settings.list_configs", b"", Duration::from_millis(1000))
        .await
        .unwrap();
    let names: Vec<String> = serde_json::from_slice(&resp.payload).unwrap();
    assert_eq!(
        names,
        vec!["field_test.json".to_string(), "settings.json".to_string()]
    );
}
