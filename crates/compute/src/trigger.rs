// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger records: condition conjunctions with transition actions.
//!
//! A trigger watches the engine's state map. Each evaluation computes the
//! conjunction of its conditions; crossing from unmet to met (or back)
//! is a transition, holding steady is a level. Each of the four outcomes
//! may carry its own action.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators understood by conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Eq,
    Ne,
    Ge,
    Le,
}

impl CompareOp {
    /// Parse a wire operator symbol. Unknown symbols are `None`, which
    /// evaluation treats as an unmet condition rather than an error.
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }

    fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Ge => lhs >= rhs,
            Self::Le => lhs <= rhs,
        }
    }
}

/// One condition: `<signal> <operator> <threshold>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Signal name looked up in the state map.
    pub name: String,
    /// Wire operator symbol (`>`, `<`, `==`, `!=`, `>=`, `<=`).
    pub operator: String,
    /// Threshold value.
    pub value: Value,
}

impl Condition {
    /// Evaluate against a current signal value.
    ///
    /// Numeric pairs compare numerically; `==`/`!=` additionally work on
    /// non-numeric values by structural equality. Everything else — an
    /// unknown operator, a non-numeric value under an ordering operator —
    /// is unmet.
    pub fn eval(&self, current: &Value) -> bool {
        let Some(op) = CompareOp::parse(&self.operator) else {
            return false;
        };

        if let (Some(lhs), Some(rhs)) = (current.as_f64(), self.value.as_f64()) {
            return op.compare(lhs, rhs);
        }

        match op {
            CompareOp::Eq => current == &self.value,
            CompareOp::Ne => current != &self.value,
            _ => false,
        }
    }
}

/// Outcome of one trigger evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameActive,
    BecameInactive,
    StillActive,
    StillInactive,
}

/// A single action descriptor. Only `publish` is executed; other types
/// are ignored with a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Payload override; defaults to `{trigger_name, timestamp}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Actions keyed by evaluation outcome. All optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerActions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_become_active: Option<ActionDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_become_inactive: Option<ActionDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_is_active: Option<ActionDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_is_inactive: Option<ActionDef>,
}

impl TriggerActions {
    pub fn for_transition(&self, transition: Transition) -> Option<&ActionDef> {
        match transition {
            Transition::BecameActive => self.on_become_active.as_ref(),
            Transition::BecameInactive => self.on_become_inactive.as_ref(),
            Transition::StillActive => self.on_is_active.as_ref(),
            Transition::StillInactive => self.on_is_inactive.as_ref(),
        }
    }
}

/// A registered trigger with its evaluation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub action: TriggerActions,
    /// Whether the conjunction held at the last evaluation. Reset on
    /// registration; flips only across an evaluation that changed the
    /// conjunction's truth value.
    #[serde(default)]
    pub is_active: bool,
    /// Epoch seconds of the last transition. Advances only on
    /// transitions, never on level evaluations.
    #[serde(default)]
    pub last_event_ts: Option<f64>,
}

impl Trigger {
    /// Apply a fresh conjunction value, updating state and reporting what
    /// happened.
    pub fn transition(&mut self, all_met: bool, now: f64) -> Transition {
        match (all_met, self.is_active) {
            (true, false) => {
                self.is_active = true;
                self.last_event_ts = Some(now);
                Transition::BecameActive
            }
            (false, true) => {
                self.is_active = false;
                self.last_event_ts = Some(now);
                Transition::BecameInactive
            }
            (true, true) => Transition::StillActive,
            (false, false) => Transition::StillInactive,
        }
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
