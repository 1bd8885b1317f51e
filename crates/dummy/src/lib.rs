// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ds-dummy: The smallest real worker.
//!
//! Publishes a counter record on `dummy.data` at its configured interval
//! and answers a `reset_counter` command. Mostly useful for exercising
//! the fabric end to end and as a crash-test unit in specs.

pub mod service;

pub use service::{DummyCommand, DummyService};
