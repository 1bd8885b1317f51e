// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus-facing settings service.
//!
//! Serves `settings.get.*` and `settings.list_configs` request/reply
//! subjects and the `commands.settings_service` command set. Every
//! effective mutation is persisted first and then announced: single-key
//! changes on `settings.updated` with the post-coercion value, full
//! reloads on `settings.reloaded`.

use crate::store::{SettingsStore, StoreError};
use async_trait::async_trait;
use ds_bus::BusClient;
use ds_core::{subject::last_segment, Envelope, SettingsDoc};
use ds_runtime::{CommandAck, RuntimeError, Service, ServiceContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Broadcast subject for single-key updates.
pub const SETTINGS_UPDATED: &str = "settings.updated";
/// Broadcast subject for whole-document reloads.
pub const SETTINGS_RELOADED: &str = "settings.reloaded";
/// Request subject listing the `.json` files next to the document.
pub const SETTINGS_LIST_CONFIGS: &str = "settings.list_configs";

/// Command set of the settings service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SettingsCommand {
    UpdateSetting { key: String, value: Value },
    UpdateSettingBlock { key: String, value: Value },
    ImportSettings { data: Value },
    LoadSettingsFromFile { filename: String },
}

/// Payload of a `settings.updated` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingUpdated {
    pub key: String,
    pub value: Value,
}

pub struct SettingsService {
    store: SettingsStore,
}

impl SettingsService {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }

    /// The bus URL from the service's own document; the settings service
    /// cannot ask itself, so its binary dials this directly.
    pub fn nats_url(&self) -> String {
        SettingsDoc::new(self.store.tree().clone())
            .nats_url()
            .to_string()
    }

    async fn broadcast_updated<B: BusClient>(
        &self,
        ctx: &ServiceContext<B>,
        key: &str,
        value: Value,
    ) {
        let payload = SettingUpdated {
            key: key.to_string(),
            value,
        };
        if let Err(e) = ctx.publish_json(SETTINGS_UPDATED, &payload).await {
            warn!(error = %e, "failed to broadcast settings.updated");
        }
    }

    async fn broadcast_reloaded<B: BusClient>(&self, ctx: &ServiceContext<B>) {
        if let Err(e) = ctx.bus.publish(SETTINGS_RELOADED, b"").await {
            warn!(error = %e, "failed to broadcast settings.reloaded");
        }
    }

    /// Apply a mutation's outcome: broadcast on success, log and answer a
    /// structured error otherwise. Persistence failures keep the
    /// in-memory change but stay silent on the bus, so peers never act on
    /// state that would not survive a restart.
    async fn finish_mutation<B: BusClient>(
        &self,
        ctx: &ServiceContext<B>,
        reply: Option<&str>,
        outcome: Result<Option<SettingUpdated>, StoreError>,
        reloaded: bool,
    ) {
        match outcome {
            Ok(update) => {
                if let Some(update) = update {
                    self.broadcast_updated(ctx, &update.key, update.value).await;
                } else if reloaded {
                    self.broadcast_reloaded(ctx).await;
                }
                ctx.ack(reply, CommandAck::ok("settings updated")).await;
            }
            Err(e @ StoreError::Io(_)) => {
                error!(error = %e, "settings persistence failed, change not broadcast");
                ctx.ack(reply, CommandAck::error(e.to_string())).await;
            }
            Err(e) => {
                warn!(error = %e, "settings update rejected");
                ctx.ack(reply, CommandAck::error(e.to_string())).await;
            }
        }
    }
}

#[async_trait]
impl<B: BusClient> Service<B> for SettingsService {
    type Command = SettingsCommand;

    fn name(&self) -> &'static str {
        "settings_service"
    }

    fn data_subjects(&self, _settings: &SettingsDoc) -> Vec<String> {
        vec![
            "settings.get.*".to_string(),
            SETTINGS_LIST_CONFIGS.to_string(),
        ]
    }

    async fn start(&mut self, _ctx: &ServiceContext<B>) -> Result<(), RuntimeError> {
        info!(path = %self.store.path().display(), "settings service ready");
        Ok(())
    }

    async fn handle_command(
        &mut self,
        command: SettingsCommand,
        reply: Option<String>,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        let reply = reply.as_deref();
        match command {
            SettingsCommand::UpdateSetting { key, value } => {
                info!(key = %key, "updating setting");
                let outcome = self.store.update_scalar(&key, &value).map(|effective| {
                    Some(SettingUpdated {
                        key: key.clone(),
                        value: effective,
                    })
                });
                self.finish_mutation(ctx, reply, outcome, false).await;
            }
            SettingsCommand::UpdateSettingBlock { key, value } => {
                info!(key = %key, "updating settings block");
                let broadcast_value = value.clone();
                let outcome = self.store.update_block(&key, value).map(|()| {
                    Some(SettingUpdated {
                        key: key.clone(),
                        value: broadcast_value,
                    })
                });
                self.finish_mutation(ctx, reply, outcome, false).await;
            }
            SettingsCommand::ImportSettings { data } => {
                info!("importing settings document");
                let outcome = self.store.import(data).map(|()| None);
                self.finish_mutation(ctx, reply, outcome, true).await;
            }
            SettingsCommand::LoadSettingsFromFile { filename } => {
                info!(filename = %filename, "loading settings from file");
                let outcome = self.store.load_from_file(&filename).map(|()| None);
                self.finish_mutation(ctx, reply, outcome, true).await;
            }
        }
        Ok(())
    }

    async fn handle_data(
        &mut self,
        envelope: Envelope,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        let Some(reply) = envelope.reply.as_deref() else {
            // Read subjects are request/reply; a bare publish has no
            // destination for the answer.
            debug!(subject = %envelope.subject, "read request without reply subject");
            return Ok(());
        };

        let response = if envelope.subject == SETTINGS_LIST_CONFIGS {
            match self.store.list_configs() {
                Ok(names) => serde_json::to_vec(&names)?,
                Err(e) => {
                    warn!(error = %e, "listing configs failed");
                    serde_json::to_vec(&Vec::<String>::new())?
                }
            }
        } else {
            let key = last_segment(&envelope.subject);
            if key == "all" {
                serde_json::to_vec(self.store.tree())?
            } else {
                serde_json::to_vec(&self.store.subtree(key))?
            }
        };

        ctx.bus.publish(reply, &response).await?;
        debug!(subject = %envelope.subject, "served settings read");
        Ok(())
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
