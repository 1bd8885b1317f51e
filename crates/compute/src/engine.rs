// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine core: state map, chained fan-out, trigger evaluation.
//!
//! `process` writes the incoming value into the state map, feeds every
//! computation registered on that signal, and recurses into each derived
//! output so chains propagate in one call. A per-call visited set breaks
//! cycles: registration cannot see chains that do not exist yet, so a
//! cycle is only detectable when the recursion re-enters an output.
//!
//! The engine is synchronous and owns all of its state; it returns the
//! publishes it wants performed and the service layer does the I/O.

use crate::computation::{Computation, ComputationKind};
use crate::trigger::{ActionDef, Transition, Trigger};
use ds_core::{Clock, Signal};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors from engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown computation type: {0}")]
    UnknownKind(String),
    #[error("output '{0}' is already registered")]
    DuplicateOutput(String),
    #[error("no computation with output '{0}'")]
    NoSuchComputation(String),
    #[error("no trigger named '{0}'")]
    NoSuchTrigger(String),
    #[error("data payload is not valid JSON: {0}")]
    BadPayload(#[source] serde_json::Error),
}

/// A publish the engine wants performed.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    pub subject: String,
    pub payload: Value,
}

struct Slot {
    output: String,
    computation: Computation,
}

/// The stateful engine behind the compute service.
pub struct Engine<C: Clock> {
    clock: C,
    /// Last value per signal name, in first-seen order.
    state: IndexMap<String, Value>,
    /// Computations keyed by their source signal.
    computations: IndexMap<String, Vec<Slot>>,
    /// Triggers in registration order.
    triggers: Vec<Trigger>,
}

impl<C: Clock> Engine<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: IndexMap::new(),
            computations: IndexMap::new(),
            triggers: Vec::new(),
        }
    }

    /// The state map: signal name to last value.
    pub fn state(&self) -> &IndexMap<String, Value> {
        &self.state
    }

    /// Names of every signal currently known.
    pub fn signal_names(&self) -> Vec<String> {
        self.state.keys().cloned().collect()
    }

    /// Registered triggers, with live evaluation state.
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Register a computation deriving `output` from `source`.
    ///
    /// Output names are unique across the whole engine, so removal by
    /// output name stays unambiguous even for chains.
    pub fn register_computation(
        &mut self,
        source: &str,
        kind: ComputationKind,
        output: &str,
    ) -> Result<(), EngineError> {
        let taken = self
            .computations
            .values()
            .flatten()
            .any(|slot| slot.output == output);
        if taken {
            return Err(EngineError::DuplicateOutput(output.to_string()));
        }

        self.computations
            .entry(source.to_string())
            .or_default()
            .push(Slot {
                output: output.to_string(),
                computation: kind.instantiate(),
            });
        info!(source, output, kind = kind.name(), "registered computation");
        Ok(())
    }

    /// Remove the computation producing `output` and forget its derived
    /// value.
    pub fn unregister_computation(&mut self, output: &str) -> Result<(), EngineError> {
        let mut found = false;
        for slots in self.computations.values_mut() {
            let before = slots.len();
            slots.retain(|slot| slot.output != output);
            if slots.len() < before {
                found = true;
                break;
            }
        }
        if !found {
            return Err(EngineError::NoSuchComputation(output.to_string()));
        }

        self.computations.retain(|_, slots| !slots.is_empty());
        self.state.shift_remove(output);
        info!(output, "unregistered computation");
        Ok(())
    }

    /// Register a trigger, replacing any existing trigger with the same
    /// name. Evaluation state starts inactive.
    pub fn register_trigger(&mut self, mut trigger: Trigger) {
        trigger.is_active = false;
        trigger.last_event_ts = None;
        self.triggers.retain(|t| t.name != trigger.name);
        info!(name = %trigger.name, "registered trigger");
        self.triggers.push(trigger);
    }

    pub fn unregister_trigger(&mut self, name: &str) -> Result<(), EngineError> {
        let before = self.triggers.len();
        self.triggers.retain(|t| t.name != name);
        if self.triggers.len() == before {
            return Err(EngineError::NoSuchTrigger(name.to_string()));
        }
        info!(name, "unregistered trigger");
        Ok(())
    }

    /// Ingest one raw record from a data subject.
    ///
    /// Records with `name` and `value` fields become the qualified signal
    /// `<source>.<name>`; `ts` is taken as epoch milliseconds when
    /// present, otherwise the wall clock stamps the sample. Any other
    /// record is stored whole under the source name.
    pub fn ingest(&mut self, source: &str, payload: &[u8]) -> Result<Vec<Publish>, EngineError> {
        let record: Value = serde_json::from_slice(payload).map_err(EngineError::BadPayload)?;

        let named = record
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .zip(record.get("value").cloned());

        let signal = match named {
            Some((name, value)) => {
                let timestamp = record
                    .get("ts")
                    .and_then(Value::as_f64)
                    .map(|ms| ms / 1000.0)
                    .unwrap_or_else(|| self.clock.epoch_secs());
                Signal::new(format!("{source}.{name}"), value, timestamp)
            }
            None => Signal::new(source, record, self.clock.epoch_secs()),
        };

        Ok(self.process(&signal))
    }

    /// Process one signal sample: update state, fan out through the
    /// computation chains, then evaluate every trigger.
    pub fn process(&mut self, signal: &Signal) -> Vec<Publish> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.fan_out(
            &signal.name,
            signal.value.clone(),
            signal.timestamp,
            &mut visited,
            &mut out,
        );
        self.evaluate_triggers(&mut out);
        out
    }

    fn fan_out(
        &mut self,
        signal: &str,
        value: Value,
        timestamp: f64,
        visited: &mut HashSet<String>,
        out: &mut Vec<Publish>,
    ) {
        debug!(signal, "processing sample");
        self.state.insert(signal.to_string(), value.clone());

        let slot_count = match self.computations.get(signal) {
            Some(slots) => slots.len(),
            None => return,
        };

        let Some(numeric) = value.as_f64() else {
            // Complex values update the state map but cannot drive
            // numeric computations.
            warn!(signal, "non-numeric value, skipping registered computations");
            return;
        };

        for i in 0..slot_count {
            let (output, new_value) = {
                let Some(slots) = self.computations.get_mut(signal) else {
                    break;
                };
                let Some(slot) = slots.get_mut(i) else {
                    break;
                };
                (slot.output.clone(), slot.computation.update(numeric, timestamp))
            };

            if !visited.insert(output.clone()) {
                error!(
                    output,
                    "computation cycle entered, breaking recursion at this output"
                );
                continue;
            }

            out.push(Publish {
                subject: format!("compute.result.{output}"),
                payload: json!({ "value": new_value, "timestamp": timestamp }),
            });

            self.fan_out(&output, Value::from(new_value), timestamp, visited, out);
        }
    }

    /// Evaluate every trigger against the state map, in registration
    /// order, appending the actions to fire.
    fn evaluate_triggers(&mut self, out: &mut Vec<Publish>) {
        let now = self.clock.epoch_secs();
        let state = &self.state;

        for trigger in &mut self.triggers {
            let all_met = trigger
                .conditions
                .iter()
                .all(|c| state.get(&c.name).map(|v| c.eval(v)).unwrap_or(false));

            let transition = trigger.transition(all_met, now);
            match transition {
                Transition::BecameActive => info!(name = %trigger.name, "trigger became active"),
                Transition::BecameInactive => {
                    info!(name = %trigger.name, "trigger became inactive")
                }
                Transition::StillActive | Transition::StillInactive => {}
            }

            if let Some(action) = trigger.action.for_transition(transition) {
                fire_action(&trigger.name, action, now, out);
            }
        }
    }
}

/// Turn an action descriptor into a publish effect. Non-publish kinds and
/// publish actions without a subject are ignored with a warning.
fn fire_action(trigger_name: &str, action: &ActionDef, now: f64, out: &mut Vec<Publish>) {
    if action.kind != "publish" {
        warn!(
            trigger = trigger_name,
            kind = %action.kind,
            "ignoring unsupported trigger action type"
        );
        return;
    }
    let Some(subject) = &action.subject else {
        warn!(trigger = trigger_name, "publish action is missing a subject");
        return;
    };

    let payload = action
        .payload
        .clone()
        .unwrap_or_else(|| json!({ "trigger_name": trigger_name, "timestamp": now }));

    out.push(Publish {
        subject: subject.clone(),
        payload,
    });
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
