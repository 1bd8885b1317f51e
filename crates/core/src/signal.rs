// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named, timestamped values flowing through the compute engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, timestamped value.
///
/// Names are dotted strings qualified by their source subject
/// (`can_data.PF_EngineSpeed`). Timestamps are epoch seconds. Values are
/// usually scalar but may carry a whole record for sources that publish
/// complex objects (e.g. the digital twin).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub value: Value,
    /// Epoch seconds, fractional.
    pub timestamp: f64,
}

impl Signal {
    pub fn new(name: impl Into<String>, value: Value, timestamp: f64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
        }
    }

    /// The value as f64, when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

/// Wire record published on `compute.result.<output>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedValue {
    pub value: f64,
    /// Epoch seconds, fractional.
    pub timestamp: f64,
}
