// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three real services cooperating over one broker: settings serves the
//! documents, the dummy worker produces data, the compute engine ingests
//! it.

use crate::prelude::*;
use ds_bus::{BusClient, MemoryBus, MemoryConnector};
use ds_dummy::DummyService;
use ds_runtime::{run_service_with_shutdown, RuntimeOptions, SettingsMode, Shutdown};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn dummy_records_flow_into_the_compute_state_map() {
    let bus = MemoryBus::new();
    let doc = json!({
        "global": {},
        "compute_service": {
            "ui_publish_interval": 30.0,
            "sources": ["dummy.data"]
        },
        "dummy_service": { "update_interval": 0.05 }
    });
    let (_settings, _dir, _path) = start_settings_service(&bus, doc).await;
    let _compute = start_compute_service(&bus).await;

    let dummy_shutdown = Shutdown::new();
    tokio::spawn(run_service_with_shutdown(
        DummyService::new(),
        MemoryConnector::new(bus.clone()),
        RuntimeOptions {
            settings: fast_fetch(),
            mode: SettingsMode::Fetch,
        },
        dummy_shutdown.clone(),
    ));

    // The dummy's records are complex (no name/value pair), so the engine
    // stores them whole under the source subject.
    wait_until(
        || !bus.published_matching("dummy.data").is_empty(),
        "a dummy counter record",
    )
    .await;

    let deadline = std::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    loop {
        let resp = bus
            .request(
                "commands.compute_service",
                br#"{"command":"get_available_signals"}"#,
                Duration::from_millis(500),
            )
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&resp.payload).unwrap();
        if v["signals"].as_array().is_some_and(|s| s.iter().any(|n| n == "dummy.data")) {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "dummy.data never reached the compute state map"
        );
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }

    // The dummy worker also answers commands while publishing.
    command_ok(
        &bus,
        "commands.dummy_service",
        r#"{"command":"reset_counter"}"#,
    )
    .await;

    dummy_shutdown.trigger();
}
