// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Digsite supervisor daemon (dsd)
//!
//! Long-running process that discovers worker units, spawns them as child
//! processes, monitors them, and exposes fleet control on the bus as the
//! `manager` service.

use ds_bus::NatsConnector;
use ds_core::DEFAULT_NATS_URL;
use ds_runtime::{run_service, RuntimeOptions, SettingsFetch, SettingsMode};
use ds_supervisor::{discover_units, Fleet, FleetConfig, SupervisorService};
use std::path::PathBuf;

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (manager.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Supervisor paths and connection settings, from the environment.
struct Config {
    units_dir: PathBuf,
    logs_dir: PathBuf,
    bus_url: String,
}

impl Config {
    fn load() -> Self {
        let units_dir = std::env::var("DS_UNITS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("units"));
        let logs_dir = std::env::var("DS_LOGS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("logs"));
        let bus_url =
            std::env::var("DS_NATS_URL").unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());
        Self {
            units_dir,
            logs_dir,
            bus_url,
        }
    }

    fn log_path(&self) -> PathBuf {
        self.logs_dir.join("manager.log")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("dsd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("dsd {}", env!("CARGO_PKG_VERSION"));
                println!("Digsite supervisor - spawns and monitors the worker fleet");
                println!();
                println!("USAGE:");
                println!("    dsd");
                println!();
                println!("ENVIRONMENT:");
                println!("    DS_UNITS_DIR    Directory of unit files (default: units)");
                println!("    DS_LOGS_DIR     Directory for log files (default: logs)");
                println!("    DS_NATS_URL     Bus URL (default: {DEFAULT_NATS_URL})");
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: dsd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load();

    // Rotate the supervisor's own log if it has grown too large
    rotate_log_if_needed(&config.log_path());

    // Set up logging
    let _log_guard = setup_logging(&config)?;

    tracing::info!(
        units_dir = %config.units_dir.display(),
        "starting supervisor"
    );

    let units = discover_units(&config.units_dir)?;
    if units.is_empty() {
        tracing::warn!(dir = %config.units_dir.display(), "no units discovered");
    }

    let fleet = Fleet::new(
        units,
        FleetConfig {
            logs_dir: config.logs_dir.clone(),
            ..FleetConfig::default()
        },
    );

    // The settings service is one of our children; dial the default URL
    // directly instead of fetching settings first.
    let opts = RuntimeOptions {
        settings: SettingsFetch {
            default_url: config.bus_url.clone(),
            ..SettingsFetch::default()
        },
        mode: SettingsMode::Skip,
    };

    run_service(SupervisorService::new(fleet), NatsConnector, opts).await?;
    tracing::info!("supervisor stopped");
    Ok(())
}

/// Rotate the supervisor log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `manager.log` into `manager.log.1` through `.3`, deleting the
/// oldest. Best-effort: rotation failures are silently ignored so the
/// supervisor still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(&config.logs_dir)?;

    let file_appender = tracing_appender::rolling::never(&config.logs_dir, "manager.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
