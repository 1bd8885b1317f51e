// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The service harness: one event loop per worker process.
//!
//! [`run_service`] drives the startup protocol (signal handlers, settings
//! fetch, long-lived connect, command subscription, domain subscriptions,
//! tickers) and then serializes every incoming event onto the service.
//! Commands, domain data, and ticks never run concurrently with each
//! other, so service state needs no locking.

use crate::bootstrap::{fetch_settings, SettingsFetch};
use crate::command::{parse_command, CommandAck};
use crate::{RuntimeError, Shutdown};
use async_trait::async_trait;
use ds_bus::{BusClient, BusConnector, BusError};
use ds_core::{Envelope, SettingsDoc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Capacity of the merged per-service event queue.
const EVENT_BUFFER: usize = 256;

/// A periodic task request: the harness delivers a tick with this label
/// every `period`.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    pub label: &'static str,
    pub period: Duration,
}

impl Ticker {
    pub fn new(label: &'static str, period: Duration) -> Self {
        Self { label, period }
    }
}

/// How the harness obtains the settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsMode {
    /// Request `settings.get.all` with retry, then dial
    /// `global.nats_url`. The normal worker path.
    Fetch,
    /// Start with an empty document and dial the default URL directly.
    /// Used by the supervisor, whose settings service is its own child.
    Skip,
}

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub settings: SettingsFetch,
    pub mode: SettingsMode,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            settings: SettingsFetch::default(),
            mode: SettingsMode::Fetch,
        }
    }
}

/// Everything a service sees of its environment.
pub struct ServiceContext<B: BusClient> {
    pub service_name: String,
    pub bus: B,
    pub settings: SettingsDoc,
    pub shutdown: Shutdown,
}

impl<B: BusClient> ServiceContext<B> {
    /// Publish a JSON-serializable value.
    pub async fn publish_json<T: Serialize>(
        &self,
        subject: &str,
        value: &T,
    ) -> Result<(), BusError> {
        let payload = serde_json::to_vec(value)?;
        self.bus.publish(subject, &payload).await
    }

    /// Publish an acknowledgement to a reply subject, when one is present.
    pub async fn ack(&self, reply: Option<&str>, ack: CommandAck) {
        if let Some(reply) = reply {
            if let Err(e) = self.bus.publish(reply, &ack.to_bytes()).await {
                warn!(error = %e, "failed to publish command ack");
            }
        }
    }
}

/// A worker service hosted by [`run_service`].
///
/// All methods run on the service's single event loop.
#[async_trait]
pub trait Service<B: BusClient>: Send + 'static {
    /// The service's command set, tagged with `command`.
    type Command: DeserializeOwned + Send;

    /// Bus name; commands arrive on `commands.<name>`.
    fn name(&self) -> &'static str;

    /// Domain subjects to subscribe to besides commands.
    fn data_subjects(&self, settings: &SettingsDoc) -> Vec<String> {
        let _ = settings;
        Vec::new()
    }

    /// Periodic tasks to drive through [`Service::handle_tick`].
    fn tickers(&self, settings: &SettingsDoc) -> Vec<Ticker> {
        let _ = settings;
        Vec::new()
    }

    /// One-time setup after the bus is connected and subscriptions are in
    /// place.
    async fn start(&mut self, ctx: &ServiceContext<B>) -> Result<(), RuntimeError> {
        let _ = ctx;
        Ok(())
    }

    /// Handle one decoded command.
    async fn handle_command(
        &mut self,
        command: Self::Command,
        reply: Option<String>,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError>;

    /// Handle one domain data message.
    async fn handle_data(
        &mut self,
        envelope: Envelope,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        let _ = (envelope, ctx);
        Ok(())
    }

    /// Handle one tick from a registered [`Ticker`].
    async fn handle_tick(
        &mut self,
        label: &'static str,
        ctx: &ServiceContext<B>,
    ) -> Result<(), RuntimeError> {
        let _ = (label, ctx);
        Ok(())
    }

    /// Release resources; the bus is still connected here.
    async fn stop(&mut self, ctx: &ServiceContext<B>) {
        let _ = ctx;
    }
}

enum LoopEvent {
    Command(Envelope),
    Data(Envelope),
    Tick(&'static str),
}

/// Run a service to completion: install signal handlers and drive the
/// event loop until shutdown.
pub async fn run_service<B, C, S>(
    service: S,
    connector: C,
    opts: RuntimeOptions,
) -> Result<(), RuntimeError>
where
    B: BusClient,
    C: BusConnector<Bus = B>,
    S: Service<B>,
{
    let shutdown = Shutdown::new();
    shutdown.install_signal_handlers()?;
    run_service_with_shutdown(service, connector, opts, shutdown).await
}

/// [`run_service`] with an externally owned shutdown event. Tests use
/// this to stop a hosted service without process signals.
pub async fn run_service_with_shutdown<B, C, S>(
    mut service: S,
    connector: C,
    opts: RuntimeOptions,
    shutdown: Shutdown,
) -> Result<(), RuntimeError>
where
    B: BusClient,
    C: BusConnector<Bus = B>,
    S: Service<B>,
{
    let name = service.name();
    info!(service = name, "service starting");

    let settings = match opts.mode {
        SettingsMode::Fetch => fetch_settings(&connector, &shutdown, &opts.settings).await?,
        SettingsMode::Skip => SettingsDoc::default(),
    };

    let url = match opts.mode {
        SettingsMode::Fetch => settings.nats_url().to_string(),
        SettingsMode::Skip => opts.settings.default_url.clone(),
    };
    let bus = connector.connect(&url).await?;
    info!(service = name, url = %url, "connected to bus");

    let ctx = ServiceContext {
        service_name: name.to_string(),
        bus,
        settings,
        shutdown: shutdown.clone(),
    };

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

    // Command subscription
    let command_subject = format!("commands.{name}");
    let mut command_sub = ctx.bus.subscribe(&command_subject).await?;
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(envelope) = command_sub.recv().await {
                if tx.send(LoopEvent::Command(envelope)).await.is_err() {
                    break;
                }
            }
        });
    }

    // Domain subscriptions
    for subject in service.data_subjects(&ctx.settings) {
        let mut sub = ctx.bus.subscribe(&subject).await?;
        debug!(service = name, subject = %subject, "subscribed to data subject");
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(envelope) = sub.recv().await {
                if tx.send(LoopEvent::Data(envelope)).await.is_err() {
                    break;
                }
            }
        });
    }

    // Tickers
    for ticker in service.tickers(&ctx.settings) {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ticker.period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval is immediate; the
            // contract here is "first fire after one period".
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(LoopEvent::Tick(ticker.label)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    service.start(&ctx).await?;
    info!(service = name, "service is running");

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            event = rx.recv() => match event {
                None => break,
                Some(LoopEvent::Command(envelope)) => {
                    dispatch_command(&mut service, &ctx, envelope).await;
                }
                Some(LoopEvent::Data(envelope)) => {
                    let subject = envelope.subject.clone();
                    if let Err(e) = service.handle_data(envelope, &ctx).await {
                        error!(service = name, subject = %subject, error = %e, "data handler failed");
                    }
                }
                Some(LoopEvent::Tick(label)) => {
                    if let Err(e) = service.handle_tick(label, &ctx).await {
                        error!(service = name, tick = label, error = %e, "tick handler failed");
                    }
                }
            }
        }
    }

    info!(service = name, "shutting down");
    service.stop(&ctx).await;
    if let Err(e) = ctx.bus.disconnect().await {
        warn!(service = name, error = %e, "bus disconnect failed");
    }
    info!(service = name, "service has stopped");
    Ok(())
}

/// Decode and execute one command message. Decode failures and handler
/// errors are logged; nothing propagates to the bus except an error ack
/// for unknown commands that asked for a reply.
async fn dispatch_command<B, S>(service: &mut S, ctx: &ServiceContext<B>, envelope: Envelope)
where
    B: BusClient,
    S: Service<B>,
{
    let raw = match parse_command(&envelope) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(service = %ctx.service_name, error = %e, "dropping malformed command message");
            return;
        }
    };

    match raw.decode::<S::Command>() {
        Ok(command) => {
            debug!(service = %ctx.service_name, command = %raw.name, "executing command");
            if let Err(e) = service.handle_command(command, raw.reply, ctx).await {
                error!(
                    service = %ctx.service_name,
                    command = %raw.name,
                    error = %e,
                    "command handler failed"
                );
            }
        }
        Err(e) => {
            warn!(service = %ctx.service_name, error = %e, "unknown command");
            ctx.ack(raw.reply.as_deref(), CommandAck::error(e.to_string()))
                .await;
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
