// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stateful derived-signal computations.
//!
//! A computation consumes one input signal and produces a derived value on
//! every update. Each kind keeps its own running state; the first sample
//! of the time-based kinds yields exactly 0.0 because no interval exists
//! yet.

use serde::{Deserialize, Serialize};

/// The registrable computation kinds, named as they appear on the wire in
/// `register_computation` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputationKind {
    RunningAverage,
    Integrator,
    Differentiator,
}

impl ComputationKind {
    /// Parse a wire kind string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RunningAverage" => Some(Self::RunningAverage),
            "Integrator" => Some(Self::Integrator),
            "Differentiator" => Some(Self::Differentiator),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RunningAverage => "RunningAverage",
            Self::Integrator => "Integrator",
            Self::Differentiator => "Differentiator",
        }
    }

    /// Fresh instance with zeroed state.
    pub fn instantiate(self) -> Computation {
        match self {
            Self::RunningAverage => Computation::RunningAverage { count: 0, sum: 0.0 },
            Self::Integrator => Computation::Integrator {
                last_value: None,
                last_timestamp: None,
                integral: 0.0,
            },
            Self::Differentiator => Computation::Differentiator {
                last_value: None,
                last_timestamp: None,
            },
        }
    }
}

/// A computation instance: kind plus accumulated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Computation {
    /// Cumulative mean of every sample seen.
    RunningAverage { count: u64, sum: f64 },
    /// Time integral by the trapezoidal rule.
    Integrator {
        last_value: Option<f64>,
        last_timestamp: Option<f64>,
        integral: f64,
    },
    /// First time derivative between consecutive samples.
    Differentiator {
        last_value: Option<f64>,
        last_timestamp: Option<f64>,
    },
}

impl Computation {
    pub fn kind(&self) -> ComputationKind {
        match self {
            Self::RunningAverage { .. } => ComputationKind::RunningAverage,
            Self::Integrator { .. } => ComputationKind::Integrator,
            Self::Differentiator { .. } => ComputationKind::Differentiator,
        }
    }

    /// Feed one sample and return the new derived value.
    ///
    /// `timestamp` is epoch seconds. Non-increasing timestamps leave the
    /// time-based kinds unchanged except for their stored last sample.
    pub fn update(&mut self, value: f64, timestamp: f64) -> f64 {
        match self {
            Self::RunningAverage { count, sum } => {
                *count += 1;
                *sum += value;
                *sum / *count as f64
            }
            Self::Integrator {
                last_value,
                last_timestamp,
                integral,
            } => {
                if let (Some(prev_v), Some(prev_t)) = (*last_value, *last_timestamp) {
                    let dt = timestamp - prev_t;
                    if dt > 0.0 {
                        *integral += (value + prev_v) / 2.0 * dt;
                    }
                }
                *last_value = Some(value);
                *last_timestamp = Some(timestamp);
                *integral
            }
            Self::Differentiator {
                last_value,
                last_timestamp,
            } => {
                let mut derivative = 0.0;
                if let (Some(prev_v), Some(prev_t)) = (*last_value, *last_timestamp) {
                    let dt = timestamp - prev_t;
                    if dt > 0.0 {
                        derivative = (value - prev_v) / dt;
                    }
                }
                *last_value = Some(value);
                *last_timestamp = Some(timestamp);
                derivative
            }
        }
    }
}

#[cfg(test)]
#[path = "computation_tests.rs"]
mod tests;
