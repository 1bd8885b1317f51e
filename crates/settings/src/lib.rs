// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ds-settings: The settings store service.
//!
//! Owns the on-disk settings document, serves read requests over the bus,
//! applies dotted-path updates, and broadcasts every effective change on
//! `settings.updated` / `settings.reloaded`. Persistence is write-through:
//! a mutation is saved to disk before it is announced.

pub mod service;
pub mod store;

pub use service::{SettingsCommand, SettingsService};
pub use store::{SettingsStore, StoreError};
