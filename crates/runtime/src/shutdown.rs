// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-service shutdown event.
//!
//! One `Shutdown` per process; SIGINT/SIGTERM trigger it, and every
//! long wait in the service races against it so workers exit promptly.

use crate::RuntimeError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cloneable shutdown event.
#[derive(Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the event. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the event fires.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// Sleep for `timeout` unless the event fires first. Returns true when
    /// shutdown fired.
    pub async fn wait_for(&self, timeout: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => true,
            _ = tokio::time::sleep(timeout) => false,
        }
    }

    /// Install SIGINT/SIGTERM handlers that trigger this event.
    ///
    /// Spawned once per process, before any other startup work, so a
    /// signal during settings acquisition still interrupts the retry loop.
    pub fn install_signal_handlers(&self) -> Result<(), RuntimeError> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).map_err(RuntimeError::Signal)?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(RuntimeError::Signal)?;
        let shutdown = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
            }
            shutdown.trigger();
        });

        Ok(())
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
