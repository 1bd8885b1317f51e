// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the service runtime

use ds_bus::BusError;
use thiserror::Error;

/// Errors that can occur in a service's lifecycle or handlers.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Command(#[from] crate::command::CommandError),
    #[error("shutdown requested during startup")]
    ShutdownDuringStartup,
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
    #[error("settings document is invalid: {0}")]
    InvalidSettings(#[source] serde_json::Error),
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Service(String),
}

impl RuntimeError {
    /// Convenience for service-specific failures.
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }
}
