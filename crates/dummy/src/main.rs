// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Digsite dummy service (ds-dummy)

use ds_bus::NatsConnector;
use ds_dummy::DummyService;
use ds_runtime::{run_service, RuntimeOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Workers log to stdout; the supervisor owns the log file.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    run_service(DummyService::new(), NatsConnector, RuntimeOptions::default()).await?;
    Ok(())
}
