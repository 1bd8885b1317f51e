// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Digsite settings service (ds-settings)
//!
//! Owns the settings document and serves it to the rest of the fleet.
//! Unlike other workers it never fetches settings over the bus — it dials
//! the URL found in its own document.

use ds_bus::NatsConnector;
use ds_runtime::{run_service, RuntimeOptions, SettingsFetch, SettingsMode};
use ds_settings::{SettingsService, SettingsStore};
use std::path::PathBuf;

/// Settings file used when neither `--settings` nor `DS_SETTINGS_PATH`
/// says otherwise.
const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let mut settings_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => settings_path = args.next().map(PathBuf::from),
            "--version" | "-V" => {
                println!("ds-settings {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("ds-settings {}", env!("CARGO_PKG_VERSION"));
                println!("Digsite settings service");
                println!();
                println!("USAGE:");
                println!("    ds-settings [--settings <path>]");
                println!();
                println!("The service is normally launched by the supervisor (dsd).");
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: ds-settings [--settings <path>]");
                std::process::exit(1);
            }
        }
    }

    // Workers log to stdout; the supervisor owns the log file.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = settings_path
        .or_else(|| std::env::var("DS_SETTINGS_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));

    let service = SettingsService::new(SettingsStore::open(path));
    let opts = RuntimeOptions {
        settings: SettingsFetch {
            default_url: service.nats_url(),
            ..SettingsFetch::default()
        },
        mode: SettingsMode::Skip,
    };

    run_service(service, NatsConnector, opts).await?;
    Ok(())
}
