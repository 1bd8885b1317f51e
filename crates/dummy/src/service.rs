// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic counter publisher.

use async_trait::async_trait;
use ds_bus::BusClient;
use ds_core::SettingsDoc;
use ds_runtime::{CommandAck, RuntimeError, Service, ServiceContext, Ticker};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Subject carrying the counter records.
pub const DUMMY_DATA: &str = "dummy.data";

/// Publish interval used when `dummy_service.update_interval` is not
/// configured.
const DEFAULT_UPDATE_INTERVAL: f64 = 5.0;

const PUBLISH_TICK: &str = "publish";

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DummyCommand {
    ResetCounter,
}

#[derive(Debug, Serialize)]
struct CounterRecord<'a> {
    message: &'a str,
    count: u64,
}

#[derive(Default)]
pub struct DummyService {
    counter: u64,
}

impl DummyService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<B: BusClient> Service<B> for DummyService {
    type Command = DummyCommand;

    fn name(&self) -> &'static str {
        "dummy_service"
    }

    fn tickers(&self, settings: &SettingsDoc) -> Vec<Ticker> {
        let interval = settings
            .update_interval("dummy_service")
            .filter(|secs| *secs > 0.0)
            .unwrap_or(DEFAULT_UPDATE_INTERVAL);
        vec![Ticker::new(PUBLISH_TICK, Duration::from_secs_f64(interval))]
    }

    async fn handle_command(
        &mut self,
        command: DummyCommand,
        reply: Option<String>,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        match command {
            DummyCommand::ResetCounter => {
                info!("counter reset");
                self.counter = 0;
                ctx.ack(reply.as_deref(), CommandAck::ok("counter has been reset"))
                    .await;
            }
        }
        Ok(())
    }

    async fn handle_tick(
        &mut self,
        label: &'static str,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        if label == PUBLISH_TICK {
            self.counter += 1;
            let record = CounterRecord {
                message: "hello from the dummy service",
                count: self.counter,
            };
            if let Err(e) = ctx.publish_json(DUMMY_DATA, &record).await {
                warn!(error = %e, "failed to publish counter");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
