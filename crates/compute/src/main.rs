// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Digsite compute service (ds-compute)
//!
//! Stateful signal processing: chained derived signals and triggers.

use ds_bus::NatsConnector;
use ds_compute::ComputeService;
use ds_core::SystemClock;
use ds_runtime::{run_service, RuntimeOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("ds-compute {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                println!("ds-compute {}", env!("CARGO_PKG_VERSION"));
                println!("Digsite compute service");
                println!();
                println!("USAGE:");
                println!("    ds-compute");
                println!();
                println!("The service is normally launched by the supervisor (dsd).");
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: ds-compute [--help | --version]");
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

    run_service(
        ComputeService::new(SystemClock),
        NatsConnector,
        RuntimeOptions::default(),
    )
    .await?;
    Ok(())
}
