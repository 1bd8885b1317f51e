// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus-facing supervisor service (`commands.manager`).
//!
//! Bootstrap peculiarity: unlike every worker, the supervisor dials the
//! default bus URL directly — the settings service is one of its own
//! children, so there is nothing to fetch settings from yet. The harness
//! runs it with `SettingsMode::Skip`.

use crate::fleet::Fleet;
use async_trait::async_trait;
use ds_bus::BusClient;
use ds_core::SettingsDoc;
use ds_runtime::{CommandAck, RuntimeError, Service, ServiceContext, Ticker};
use serde::Deserialize;
use tracing::{info, warn};

/// Subject carrying fleet snapshots.
pub const MANAGER_STATUS: &str = "manager.status";

const MONITOR_TICK: &str = "monitor";

/// Command set of the supervisor.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SupervisorCommand {
    StartService { service_name: String },
    StopService { service_name: String },
    RestartService { service_name: String },
    StartAll,
    StopAll,
    RestartAll,
    GetStatus,
}

pub struct SupervisorService {
    fleet: Fleet,
}

impl SupervisorService {
    pub fn new(fleet: Fleet) -> Self {
        Self { fleet }
    }

    /// Publish the fleet snapshot, forced even when nothing changed.
    async fn publish_snapshot<B: BusClient>(&self, ctx: &ServiceContext<B>, subject: &str) {
        if let Err(e) = ctx.publish_json(subject, &self.fleet.snapshot()).await {
            warn!(error = %e, "failed to publish fleet snapshot");
        }
    }
}

#[async_trait]
impl<B: BusClient> Service<B> for SupervisorService {
    type Command = SupervisorCommand;

    fn name(&self) -> &'static str {
        "manager"
    }

    fn tickers(&self, _settings: &SettingsDoc) -> Vec<Ticker> {
        vec![Ticker::new(MONITOR_TICK, self.fleet.config().monitor_interval)]
    }

    async fn start(&mut self, ctx: &ServiceContext<B>) -> Result<(), RuntimeError> {
        info!(units = ?self.fleet.service_names(), "starting the fleet");
        self.fleet.start_all().await;
        self.publish_snapshot(ctx, MANAGER_STATUS).await;
        Ok(())
    }

    async fn handle_command(
        &mut self,
        command: SupervisorCommand,
        reply: Option<String>,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        let reply = reply.as_deref();
        match command {
            SupervisorCommand::StartService { service_name } => {
                let ack = match self.fleet.start_service(&service_name) {
                    Ok(()) => CommandAck::ok(format!("{service_name} started")),
                    Err(e) => CommandAck::error(e.to_string()),
                };
                self.publish_snapshot(ctx, MANAGER_STATUS).await;
                ctx.ack(reply, ack).await;
            }
            SupervisorCommand::StopService { service_name } => {
                let ack = match self.fleet.stop_service(&service_name).await {
                    Ok(()) => CommandAck::ok(format!("{service_name} stopped")),
                    Err(e) => CommandAck::error(e.to_string()),
                };
                self.publish_snapshot(ctx, MANAGER_STATUS).await;
                ctx.ack(reply, ack).await;
            }
            SupervisorCommand::RestartService { service_name } => {
                if let Err(e) = self.fleet.stop_service(&service_name).await {
                    self.publish_snapshot(ctx, MANAGER_STATUS).await;
                    ctx.ack(reply, CommandAck::error(e.to_string())).await;
                    return Ok(());
                }
                // Status goes out between the stop and the start.
                self.publish_snapshot(ctx, MANAGER_STATUS).await;
                let ack = match self.fleet.start_service(&service_name) {
                    Ok(()) => CommandAck::ok(format!("{service_name} restarted")),
                    Err(e) => CommandAck::error(e.to_string()),
                };
                self.publish_snapshot(ctx, MANAGER_STATUS).await;
                ctx.ack(reply, ack).await;
            }
            SupervisorCommand::StartAll => {
                self.fleet.start_all().await;
                self.publish_snapshot(ctx, MANAGER_STATUS).await;
                ctx.ack(reply, CommandAck::ok("fleet started")).await;
            }
            SupervisorCommand::StopAll => {
                self.fleet.stop_all().await;
                self.publish_snapshot(ctx, MANAGER_STATUS).await;
                ctx.ack(reply, CommandAck::ok("fleet stopped")).await;
            }
            SupervisorCommand::RestartAll => {
                self.fleet.stop_all().await;
                self.publish_snapshot(ctx, MANAGER_STATUS).await;
                self.fleet.start_all().await;
                self.publish_snapshot(ctx, MANAGER_STATUS).await;
                ctx.ack(reply, CommandAck::ok("fleet restarted")).await;
            }
            SupervisorCommand::GetStatus => {
                // Forced snapshot: to the reply subject when the caller
                // gave one, broadcast otherwise.
                let subject = reply.unwrap_or(MANAGER_STATUS);
                self.publish_snapshot(ctx, subject).await;
            }
        }
        Ok(())
    }

    async fn handle_tick(
        &mut self,
        label: &'static str,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        if label == MONITOR_TICK && self.fleet.poll() {
            self.publish_snapshot(ctx, MANAGER_STATUS).await;
        }
        Ok(())
    }

    async fn stop(&mut self, ctx: &ServiceContext<B>) {
        info!("stopping the fleet");
        self.fleet.stop_all().await;
        self.publish_snapshot(ctx, MANAGER_STATUS).await;
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
