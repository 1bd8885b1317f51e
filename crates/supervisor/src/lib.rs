// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ds-supervisor: The fleet supervisor (bus name `manager`).
//!
//! Discovers worker units, spawns them as child processes with their
//! output redirected into per-unit log files, monitors liveness on a
//! fixed period, restarts crashed workers up to a bounded retry count,
//! and publishes fleet snapshots on `manager.status`.

pub mod fleet;
pub mod service;
pub mod unit;

pub use fleet::{Fleet, FleetConfig, SupervisorError};
pub use service::{SupervisorCommand, SupervisorService};
pub use unit::{discover_units, Unit};
