// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus-facing compute service.
//!
//! Subscribes to the configured data subjects, feeds every record into
//! the engine, and performs the publishes the engine asks for. Commands
//! manage computations and triggers at runtime; a periodic tick publishes
//! the full engine state for the UI.

use crate::computation::ComputationKind;
use crate::engine::{Engine, EngineError, Publish};
use crate::trigger::Trigger;
use async_trait::async_trait;
use ds_bus::BusClient;
use ds_core::{Clock, Envelope, SettingsDoc};
use ds_runtime::{CommandAck, RuntimeError, Service, ServiceContext, Ticker};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Subject carrying the periodic full-state snapshot.
pub const STATE_FULL: &str = "compute.state.full";
/// Subject carrying service lifecycle records.
pub const COMPUTE_STATUS: &str = "compute.status";

/// Data subjects consumed when the settings document does not configure
/// `compute_service.sources`.
const DEFAULT_SOURCES: &[&str] = &["can_data", "digital_twin.data"];

/// Snapshot interval used when `compute_service.ui_publish_interval` is
/// not configured.
const DEFAULT_UI_PUBLISH_INTERVAL: f64 = 1.0;

const SNAPSHOT_TICK: &str = "state_snapshot";

/// Command set of the compute service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ComputeCommand {
    RegisterComputation {
        source_signal: String,
        computation_type: String,
        output_name: String,
    },
    UnregisterComputation {
        output_name: String,
    },
    RegisterTrigger {
        trigger: Trigger,
    },
    UnregisterTrigger {
        name: String,
    },
    GetAvailableSignals,
}

/// Periodic full-state payload.
#[derive(Debug, Serialize)]
struct StateSnapshot<'a> {
    computation_state: &'a indexmap::IndexMap<String, serde_json::Value>,
    triggers: &'a [Trigger],
}

/// Lifecycle record on `compute.status`.
#[derive(Debug, Serialize)]
struct StatusRecord<'a> {
    service: &'a str,
    status: &'a str,
    /// Epoch seconds.
    timestamp: f64,
}

pub struct ComputeService<C: Clock> {
    clock: C,
    engine: Engine<C>,
}

impl<C: Clock> ComputeService<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock: clock.clone(),
            engine: Engine::new(clock),
        }
    }

    /// The engine, for direct inspection in tests.
    pub fn engine(&self) -> &Engine<C> {
        &self.engine
    }

    async fn perform<B: BusClient>(&self, ctx: &ServiceContext<B>, effects: Vec<Publish>) {
        for publish in effects {
            if let Err(e) = ctx.publish_json(&publish.subject, &publish.payload).await {
                warn!(subject = %publish.subject, error = %e, "engine publish failed");
            }
        }
    }

    async fn publish_status<B: BusClient>(&self, ctx: &ServiceContext<B>, status: &str) {
        let record = StatusRecord {
            service: "compute_service",
            status,
            timestamp: self.clock.epoch_secs(),
        };
        if let Err(e) = ctx.publish_json(COMPUTE_STATUS, &record).await {
            warn!(error = %e, "failed to publish compute status");
        }
    }

    fn ack_outcome(result: Result<(), EngineError>, done: &str) -> CommandAck {
        match result {
            Ok(()) => CommandAck::ok(done),
            Err(e) => CommandAck::error(e.to_string()),
        }
    }
}

#[async_trait]
impl<B: BusClient, C: Clock> Service<B> for ComputeService<C> {
    type Command = ComputeCommand;

    fn name(&self) -> &'static str {
        "compute_service"
    }

    fn data_subjects(&self, settings: &SettingsDoc) -> Vec<String> {
        settings
            .at("compute_service.sources")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect())
    }

    fn tickers(&self, settings: &SettingsDoc) -> Vec<Ticker> {
        let interval = settings
            .f64_at("compute_service.ui_publish_interval")
            .filter(|secs| *secs > 0.0)
            .unwrap_or(DEFAULT_UI_PUBLISH_INTERVAL);
        vec![Ticker::new(SNAPSHOT_TICK, Duration::from_secs_f64(interval))]
    }

    async fn start(&mut self, ctx: &ServiceContext<B>) -> Result<(), RuntimeError> {
        self.publish_status(ctx, "starting").await;
        info!("compute service ready");
        self.publish_status(ctx, "running").await;
        Ok(())
    }

    async fn handle_command(
        &mut self,
        command: ComputeCommand,
        reply: Option<String>,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        let reply = reply.as_deref();
        match command {
            ComputeCommand::RegisterComputation {
                source_signal,
                computation_type,
                output_name,
            } => {
                let ack = match ComputationKind::from_name(&computation_type) {
                    Some(kind) => Self::ack_outcome(
                        self.engine
                            .register_computation(&source_signal, kind, &output_name),
                        "computation registered",
                    ),
                    None => {
                        warn!(kind = %computation_type, "unknown computation type");
                        CommandAck::error(format!(
                            "unknown computation type: {computation_type}"
                        ))
                    }
                };
                ctx.ack(reply, ack).await;
            }
            ComputeCommand::UnregisterComputation { output_name } => {
                let ack = Self::ack_outcome(
                    self.engine.unregister_computation(&output_name),
                    "computation unregistered",
                );
                ctx.ack(reply, ack).await;
            }
            ComputeCommand::RegisterTrigger { trigger } => {
                self.engine.register_trigger(trigger);
                ctx.ack(reply, CommandAck::ok("trigger registered")).await;
            }
            ComputeCommand::UnregisterTrigger { name } => {
                let ack =
                    Self::ack_outcome(self.engine.unregister_trigger(&name), "trigger unregistered");
                ctx.ack(reply, ack).await;
            }
            ComputeCommand::GetAvailableSignals => {
                if let Some(reply) = reply {
                    let response = serde_json::json!({
                        "status": "ok",
                        "signals": self.engine.signal_names(),
                    });
                    if let Err(e) = ctx.publish_json(reply, &response).await {
                        warn!(error = %e, "failed to reply with available signals");
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_data(
        &mut self,
        envelope: Envelope,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        match self.engine.ingest(&envelope.subject, &envelope.payload) {
            Ok(effects) => self.perform(ctx, effects).await,
            Err(e) => {
                warn!(subject = %envelope.subject, error = %e, "dropping bad data record");
            }
        }
        Ok(())
    }

    async fn handle_tick(
        &mut self,
        label: &'static str,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        if label == SNAPSHOT_TICK {
            let snapshot = StateSnapshot {
                computation_state: self.engine.state(),
                triggers: self.engine.triggers(),
            };
            ctx.publish_json(STATE_FULL, &snapshot).await?;
        }
        Ok(())
    }

    async fn stop(&mut self, ctx: &ServiceContext<B>) {
        self.publish_status(ctx, "stopping").await;
        info!("compute service shutting down");
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
