// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ds-runtime: The lifecycle harness every Digsite worker inherits.
//!
//! A worker process is one [`Service`] driven by [`run_service`]: signal
//! handlers install a shutdown event, settings are fetched with retry over
//! a short-lived bus connection, the long-lived client connects, and a
//! single event loop serializes command messages, domain data, and
//! periodic ticks onto the service.

pub mod bootstrap;
pub mod command;
pub mod error;
pub mod service;
pub mod shutdown;

pub use bootstrap::{fetch_settings, SettingsFetch};
pub use command::{parse_command, CommandAck, CommandError, RawCommand};
pub use error::RuntimeError;
pub use service::{
    run_service, run_service_with_shutdown, RuntimeOptions, Service, ServiceContext, SettingsMode,
    Ticker,
};
pub use shutdown::Shutdown;
