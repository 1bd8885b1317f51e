// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chained derived signals across real services.

use crate::prelude::*;
use ds_bus::{BusClient, MemoryBus};
use serde_json::json;
use std::time::Duration;

fn fabric_doc() -> serde_json::Value {
    json!({
        "global": { "nats_url": "nats://localhost:4222" },
        "compute_service": { "ui_publish_interval": 30.0 }
    })
}

#[tokio::test]
async fn chained_compute_propagates_in_one_ingest() {
    let bus = MemoryBus::new();
    let (_settings, _dir, _path) = start_settings_service(&bus, fabric_doc()).await;
    let _compute = start_compute_service(&bus).await;

    command_ok(
        &bus,
        "commands.compute_service",
        r#"{"command":"register_computation","source_signal":"can_data.speed","computation_type":"RunningAverage","output_name":"speed_avg"}"#,
    )
    .await;
    command_ok(
        &bus,
        "commands.compute_service",
        r#"{"command":"register_computation","source_signal":"speed_avg","computation_type":"Differentiator","output_name":"speed_acc"}"#,
    )
    .await;

    bus.publish("can_data", br#"{"name":"speed","value":10,"ts":0}"#)
        .await
        .unwrap();
    bus.publish("can_data", br#"{"name":"speed","value":20,"ts":1000}"#)
        .await
        .unwrap();

    let results = || bus.published_matching("compute.result.*");
    wait_until(|| results().len() == 4, "four compute.result publishes").await;

    // Per ingest: one publish for each chain stage, avg before acc.
    let subjects: Vec<String> = results().iter().map(|e| e.subject.clone()).collect();
    assert_eq!(
        subjects,
        vec![
            "compute.result.speed_avg",
            "compute.result.speed_acc",
            "compute.result.speed_avg",
            "compute.result.speed_acc",
        ]
    );

    let avg: serde_json::Value = serde_json::from_slice(&results()[2].payload).unwrap();
    assert_eq!(avg["value"], json!(15.0));
    let acc: serde_json::Value = serde_json::from_slice(&results()[3].payload).unwrap();
    assert_eq!(acc["value"], json!(5.0));

    // The state map lists raw and derived signals alike.
    let resp = bus
        .request(
            "commands.compute_service",
            br#"{"command":"get_available_signals"}"#,
            Duration::from_millis(1000),
        )
        .await
        .unwrap();
    let v: serde_json::Value = serde_json::from_slice(&resp.payload).unwrap();
    let signals: Vec<String> = v["signals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();
    assert!(signals.contains(&"can_data.speed".to_string()));
    assert!(signals.contains(&"speed_avg".to_string()));
    assert!(signals.contains(&"speed_acc".to_string()));
}

#[tokio::test]
async fn unregistering_a_chain_stage_stops_its_output() {
    let bus = MemoryBus::new();
    let (_settings, _dir, _path) = start_settings_service(&bus, fabric_doc()).await;
    let _compute = start_compute_service(&bus).await;

    command_ok(
        &bus,
        "commands.compute_service",
        r#"{"command":"register_computation","source_signal":"can_data.speed","computation_type":"RunningAverage","output_name":"speed_avg"}"#,
    )
    .await;

    bus.publish("can_data", br#"{"name":"speed","value":10}"#)
        .await
        .unwrap();
    wait_until(
        || !bus.published_matching("compute.result.speed_avg").is_empty(),
        "first derived publish",
    )
    .await;

    command_ok(
        &bus,
        "commands.compute_service",
        r#"{"command":"unregister_computation","output_name":"speed_avg"}"#,
    )
    .await;

    // The derived signal is gone from the state map...
    let resp = bus
        .request(
            "commands.compute_service",
            br#"{"command":"get_available_signals"}"#,
            Duration::from_millis(1000),
        )
        .await
        .unwrap();
    let v: serde_json::Value = serde_json::from_slice(&resp.payload).unwrap();
    assert!(!v["signals"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s == "speed_avg"));

    // ...and further samples produce no more derived publishes.
    bus.clear_published();
    bus.publish("can_data", br#"{"name":"speed","value":20}"#)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(bus.published_matching("compute.result.*").is_empty());
}
