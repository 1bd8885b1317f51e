// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor lifecycle with real child processes.

use crate::prelude::*;
use ds_bus::{BusClient, MemoryBus, MemoryConnector};
use ds_core::{FleetSnapshot, ServiceStatus};
use ds_runtime::{run_service_with_shutdown, RuntimeOptions, SettingsMode, Shutdown};
use ds_supervisor::unit::UnitFile;
use ds_supervisor::{Fleet, FleetConfig, SupervisorService, Unit};
use std::collections::BTreeMap;
use std::time::Duration;
use tempfile::TempDir;

fn unit(name: &str, command: &str, args: &[&str]) -> Unit {
    Unit {
        name: name.to_string(),
        file: UnitFile {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::new(),
        },
    }
}

async fn start_supervisor(units: Vec<Unit>, bus: &MemoryBus) -> (Shutdown, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = FleetConfig {
        graceful_timeout: Duration::from_millis(300),
        settings_warmup: Duration::from_millis(10),
        monitor_interval: Duration::from_millis(30),
        logs_dir: dir.path().join("logs"),
        ..FleetConfig::default()
    };

    let shutdown = Shutdown::new();
    tokio::spawn(run_service_with_shutdown(
        SupervisorService::new(Fleet::new(units, config)),
        MemoryConnector::new(bus.clone()),
        RuntimeOptions {
            mode: SettingsMode::Skip,
            ..RuntimeOptions::default()
        },
        shutdown.clone(),
    ));
    wait_for_subscriber(bus, "commands.manager").await;
    (shutdown, dir)
}

fn last_snapshot(bus: &MemoryBus) -> Option<FleetSnapshot> {
    bus.published_matching("manager.status")
        .last()
        .map(|e| serde_json::from_slice(&e.payload).unwrap())
}

#[tokio::test]
async fn crash_loop_ends_in_quarantine_with_status_trail() {
    let bus = MemoryBus::new();
    let (_shutdown, _dir) =
        start_supervisor(vec![unit("flaky", "sh", &["-c", "exit 1"])], &bus).await;

    wait_until(
        || {
            last_snapshot(&bus)
                .map(|s| s.services[0].status == ServiceStatus::Error)
                .unwrap_or(false)
        },
        "quarantine after the restart budget",
    )
    .await;

    let snap = last_snapshot(&bus).unwrap();
    assert_eq!(snap.services[0].restart_count, 3);
    assert_eq!(snap.services[0].exit_code, Some(1));

    // Every snapshot along the way was a state change; each crash cycle
    // published at least once.
    assert!(bus.published_matching("manager.status").len() >= 3);
}

#[tokio::test]
async fn stopped_services_stay_stopped() {
    let bus = MemoryBus::new();
    // Ignores SIGTERM; the supervisor has to kill it at the window.
    let (_shutdown, _dir) = start_supervisor(
        vec![unit("stubborn", "sh", &["-c", "trap '' TERM; sleep 30"])],
        &bus,
    )
    .await;

    // Give the shell a moment to install its trap.
    tokio::time::sleep(Duration::from_millis(100)).await;

    command_ok(
        &bus,
        "commands.manager",
        r#"{"command":"stop_service","service_name":"stubborn"}"#,
    )
    .await;

    let snap = last_snapshot(&bus).unwrap();
    assert_eq!(snap.services[0].status, ServiceStatus::Stopped);

    // last_command == stop: several monitor periods later it is still
    // stopped, not restarted.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let snap = last_snapshot(&bus).unwrap();
    assert_eq!(snap.services[0].status, ServiceStatus::Stopped);
    assert_eq!(snap.services[0].restart_count, 0);
}

#[tokio::test]
async fn restart_all_round_trips_the_fleet() {
    let bus = MemoryBus::new();
    let (_shutdown, _dir) =
        start_supervisor(vec![unit("worker", "sleep", &["30"])], &bus).await;

    command_ok(&bus, "commands.manager", r#"{"command":"restart_all"}"#).await;

    let snap = last_snapshot(&bus).unwrap();
    assert_eq!(snap.services[0].status, ServiceStatus::Running);

    command_ok(&bus, "commands.manager", r#"{"command":"stop_all"}"#).await;
    let snap = last_snapshot(&bus).unwrap();
    assert_eq!(snap.services[0].status, ServiceStatus::Stopped);
}
