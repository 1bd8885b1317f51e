// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for the fabric specifications.

#![allow(dead_code)]

use ds_bus::{BusClient, MemoryBus, MemoryConnector};
use ds_compute::ComputeService;
use ds_core::SystemClock;
use ds_runtime::{
    run_service_with_shutdown, RuntimeOptions, SettingsFetch, SettingsMode, Shutdown,
};
use ds_settings::{SettingsService, SettingsStore};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Deadline for poll-style waits.
pub const SPEC_WAIT_MAX_MS: u64 = 2000;
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;

/// Fast retry/request tuning for in-memory runs.
pub fn fast_fetch() -> SettingsFetch {
    SettingsFetch {
        retry_interval: Duration::from_millis(20),
        request_timeout: Duration::from_millis(100),
        ..SettingsFetch::default()
    }
}

/// Spawn the real settings service over `bus`, backed by a temp file
/// seeded with `doc`. Returns the shutdown handle, the temp dir, and the
/// settings file path.
pub async fn start_settings_service(
    bus: &MemoryBus,
    doc: serde_json::Value,
) -> (Shutdown, TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();

    let shutdown = Shutdown::new();
    tokio::spawn(run_service_with_shutdown(
        SettingsService::new(SettingsStore::open(path.clone())),
        MemoryConnector::new(bus.clone()),
        RuntimeOptions {
            settings: fast_fetch(),
            mode: SettingsMode::Skip,
        },
        shutdown.clone(),
    ));
    wait_for_subscriber(bus, "settings.get.all").await;

    (shutdown, dir, path)
}

/// Spawn the real compute service over `bus`; it fetches its settings
/// from whatever settings service answers on the same bus.
pub async fn start_compute_service(bus: &MemoryBus) -> Shutdown {
    let shutdown = Shutdown::new();
    tokio::spawn(run_service_with_shutdown(
        ComputeService::new(SystemClock),
        MemoryConnector::new(bus.clone()),
        RuntimeOptions {
            settings: fast_fetch(),
            mode: SettingsMode::Fetch,
        },
        shutdown.clone(),
    ));
    wait_for_subscriber(bus, "commands.compute_service").await;
    shutdown
}

/// Wait until a request on `subject` is answered, i.e. the serving
/// subscription is installed.
pub async fn wait_for_subscriber(bus: &MemoryBus, subject: &str) {
    let deadline = std::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    loop {
        // Either an answered request or simple passage of time proves the
        // service loop is up; commands subjects answer unknown commands
        // with an error ack, read subjects answer with data.
        let probe = bus
            .request(
                subject,
                br#"{"command":"__probe"}"#,
                Duration::from_millis(50),
            )
            .await;
        if probe.is_ok() {
            return;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "no subscriber appeared on {subject}"
        );
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}

/// Send a command and assert the structured ack is ok.
pub async fn command_ok(bus: &MemoryBus, subject: &str, payload: &str) {
    let resp = bus
        .request(subject, payload.as_bytes(), Duration::from_millis(1000))
        .await
        .unwrap();
    let ack: serde_json::Value = serde_json::from_slice(&resp.payload).unwrap();
    assert_eq!(ack["status"], "ok", "command failed: {ack}");
}

/// Poll until `pred` holds or the deadline passes.
pub async fn wait_until(mut pred: impl FnMut() -> bool, what: &str) {
    let deadline = std::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while !pred() {
        assert!(
            std::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}
