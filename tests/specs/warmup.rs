// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings warm-up: workers started before the settings service keep
//! retrying and come up once it answers.

use crate::prelude::*;
use ds_bus::{BusClient, MemoryBus, MemoryConnector};
use ds_compute::ComputeService;
use ds_core::SystemClock;
use ds_runtime::{run_service_with_shutdown, RuntimeOptions, SettingsMode, Shutdown};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn worker_survives_a_late_settings_service() {
    let bus = MemoryBus::new();

    // Compute starts first; its settings requests time out for a while.
    let compute_shutdown = Shutdown::new();
    tokio::spawn(run_service_with_shutdown(
        ComputeService::new(SystemClock),
        MemoryConnector::new(bus.clone()),
        RuntimeOptions {
            settings: fast_fetch(),
            mode: SettingsMode::Fetch,
        },
        compute_shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(150)).await;
    // Still fetching: the command subscription is not up yet.
    assert!(bus
        .request(
            "commands.compute_service",
            br#"{"command":"get_available_signals"}"#,
            Duration::from_millis(50),
        )
        .await
        .is_err());

    // The settings service arrives late, as after a supervisor warm-up.
    let (_settings, _dir, _path) = start_settings_service(
        &bus,
        json!({"global": {}, "compute_service": {"ui_publish_interval": 30.0}}),
    )
    .await;

    wait_for_subscriber(&bus, "commands.compute_service").await;

    // More than one fetch attempt hit the bus before one was served.
    assert!(bus.published_matching("settings.get.all").len() > 1);

    compute_shutdown.trigger();
}
