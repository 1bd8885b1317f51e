// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger state machine behavior over the bus.

use crate::prelude::*;
use ds_bus::{BusClient, MemoryBus};
use serde_json::json;

fn fabric_doc() -> serde_json::Value {
    json!({
        "global": {},
        "compute_service": { "ui_publish_interval": 30.0 }
    })
}

#[tokio::test]
async fn transition_sequence_fires_each_action_kind_once() {
    let bus = MemoryBus::new();
    let (_settings, _dir, _path) = start_settings_service(&bus, fabric_doc()).await;
    let _compute = start_compute_service(&bus).await;

    command_ok(
        &bus,
        "commands.compute_service",
        r#"{"command":"register_trigger","trigger":{
            "name":"overspeed",
            "conditions":[{"name":"can_data.some_signal","operator":">","value":50}],
            "action":{
                "on_become_active":{"type":"publish","subject":"test.active"},
                "on_become_inactive":{"type":"publish","subject":"test.inactive"},
                "on_is_active":{"type":"publish","subject":"test.level_active"},
                "on_is_inactive":{"type":"publish","subject":"test.level_inactive"}
            }
        }}"#,
    )
    .await;

    for value in [40, 60, 70, 30] {
        let record = json!({"name": "some_signal", "value": value});
        bus.publish("can_data", &serde_json::to_vec(&record).unwrap())
            .await
            .unwrap();
    }

    wait_until(
        || bus.published_matching("test.>").len() == 4,
        "four trigger action publishes",
    )
    .await;

    let fired: Vec<String> = bus
        .published_matching("test.>")
        .iter()
        .map(|e| e.subject.clone())
        .collect();
    assert_eq!(
        fired,
        vec![
            "test.level_inactive", // 40: still below
            "test.active",         // 60: crossed up
            "test.level_active",   // 70: held
            "test.inactive",       // 30: crossed down
        ]
    );

    // Default payloads carry the trigger name.
    let active: serde_json::Value =
        serde_json::from_slice(&bus.published_matching("test.active")[0].payload).unwrap();
    assert_eq!(active["trigger_name"], json!("overspeed"));
}

#[tokio::test]
async fn snapshot_reflects_trigger_state() {
    let bus = MemoryBus::new();
    let doc = json!({
        "global": {},
        "compute_service": { "ui_publish_interval": 0.05 }
    });
    let (_settings, _dir, _path) = start_settings_service(&bus, doc).await;
    let _compute = start_compute_service(&bus).await;

    command_ok(
        &bus,
        "commands.compute_service",
        r#"{"command":"register_trigger","trigger":{
            "name":"overspeed",
            "conditions":[{"name":"can_data.speed","operator":">","value":50}],
            "action":{}
        }}"#,
    )
    .await;
    bus.publish("can_data", br#"{"name":"speed","value":60}"#)
        .await
        .unwrap();

    wait_until(
        || {
            bus.published_matching("compute.state.full")
                .last()
                .map(|e| {
                    let snap: serde_json::Value = serde_json::from_slice(&e.payload).unwrap();
                    snap["triggers"][0]["is_active"] == json!(true)
                })
                .unwrap_or(false)
        },
        "snapshot showing the active trigger",
    )
    .await;
}
