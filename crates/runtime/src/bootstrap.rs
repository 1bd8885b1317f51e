// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings acquisition at service startup.
//!
//! Every worker asks the settings service for the full document before it
//! opens its long-lived bus connection: a short-lived connection issues
//! `request("settings.get.all")` and is dropped again. Failures retry on a
//! fixed interval until the shutdown event fires, so a worker started
//! before the settings service becomes ready simply waits for it.

use crate::{RuntimeError, Shutdown};
use ds_bus::{BusClient, BusConnector};
use ds_core::{SettingsDoc, DEFAULT_NATS_URL};
use std::time::Duration;
use tracing::{info, warn};

/// Subject answered by the settings service with the whole document.
pub const SETTINGS_GET_ALL: &str = "settings.get.all";

/// Tuning for the settings bootstrap.
#[derive(Debug, Clone)]
pub struct SettingsFetch {
    /// Broker URL for the short-lived bootstrap connection.
    pub default_url: String,
    /// Delay between attempts.
    pub retry_interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for SettingsFetch {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_NATS_URL.to_string(),
            retry_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(2),
        }
    }
}

/// Fetch the settings document, retrying until success or shutdown.
pub async fn fetch_settings<C: BusConnector>(
    connector: &C,
    shutdown: &Shutdown,
    opts: &SettingsFetch,
) -> Result<SettingsDoc, RuntimeError> {
    loop {
        if shutdown.is_triggered() {
            return Err(RuntimeError::ShutdownDuringStartup);
        }

        match try_fetch(connector, opts).await {
            Ok(doc) => {
                info!("settings received");
                return Ok(doc);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in = ?opts.retry_interval,
                    "could not get settings"
                );
            }
        }

        if shutdown.wait_for(opts.retry_interval).await {
            return Err(RuntimeError::ShutdownDuringStartup);
        }
    }
}

async fn try_fetch<C: BusConnector>(
    connector: &C,
    opts: &SettingsFetch,
) -> Result<SettingsDoc, RuntimeError> {
    let client = connector.connect(&opts.default_url).await?;
    let result = client
        .request(SETTINGS_GET_ALL, b"", opts.request_timeout)
        .await;
    let _ = client.disconnect().await;

    let response = result?;
    SettingsDoc::from_slice(&response.payload).map_err(RuntimeError::InvalidSettings)
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
