// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broker for testing.
//!
//! Implements the same subject semantics as the real broker — wildcard
//! matching, per-subscription FIFO, queue groups, request/reply over
//! private inboxes — entirely in memory. Every clone of a [`MemoryBus`]
//! shares one broker, so a test can hand clones to several services and
//! observe their traffic through [`MemoryBus::published`].

use crate::{BusClient, BusError, Subscription, SUBSCRIPTION_BUFFER};
use async_trait::async_trait;
use ds_core::{subject_matches, Envelope};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

struct SubEntry {
    id: u64,
    pattern: String,
    queue_group: Option<String>,
    tx: mpsc::Sender<Envelope>,
}

#[derive(Default)]
struct BrokerState {
    subs: Vec<SubEntry>,
    next_id: u64,
    /// Round-robin cursor per queue group.
    group_cursor: HashMap<String, usize>,
    /// Every envelope that crossed the broker, for test assertions.
    published: Vec<Envelope>,
}

/// Shared in-memory broker; clones are clients of the same broker.
#[derive(Clone, Default)]
pub struct MemoryBus {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// All envelopes published so far, in order.
    pub fn published(&self) -> Vec<Envelope> {
        self.state.lock().published.clone()
    }

    /// Envelopes published to subjects matching `pattern`, in order.
    pub fn published_matching(&self, pattern: &str) -> Vec<Envelope> {
        self.state
            .lock()
            .published
            .iter()
            .filter(|e| subject_matches(pattern, &e.subject))
            .cloned()
            .collect()
    }

    /// Forget recorded traffic (subscriptions are unaffected).
    pub fn clear_published(&self) {
        self.state.lock().published.clear();
    }

    fn deliver(&self, envelope: Envelope) {
        let mut state = self.state.lock();
        state.published.push(envelope.clone());

        // Collect matching targets first: plain subscriptions all receive,
        // queue groups receive on one member chosen round-robin.
        let mut targets: Vec<mpsc::Sender<Envelope>> = Vec::new();
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        let mut dead: Vec<u64> = Vec::new();

        for (idx, entry) in state.subs.iter().enumerate() {
            if !subject_matches(&entry.pattern, &envelope.subject) {
                continue;
            }
            if entry.tx.is_closed() {
                dead.push(entry.id);
                continue;
            }
            match &entry.queue_group {
                Some(group) => groups.entry(group.clone()).or_default().push(idx),
                None => targets.push(entry.tx.clone()),
            }
        }

        for (group, members) in groups {
            let cursor = state.group_cursor.entry(group).or_insert(0);
            let chosen = members[*cursor % members.len()];
            *cursor = cursor.wrapping_add(1);
            targets.push(state.subs[chosen].tx.clone());
        }

        state.subs.retain(|s| !dead.contains(&s.id));
        drop(state);

        for tx in targets {
            // Best-effort: a full queue means a slow consumer, drop.
            let _ = tx.try_send(envelope.clone());
        }
    }

    fn add_subscription(
        &self,
        pattern: &str,
        queue_group: Option<&str>,
    ) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.subs.push(SubEntry {
            id,
            pattern: pattern.to_string(),
            queue_group: queue_group.map(str::to_string),
            tx,
        });
        Subscription::new(pattern.to_string(), rx)
    }
}

#[async_trait]
impl BusClient for MemoryBus {
    async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), BusError> {
        self.deliver(Envelope::new(subject, payload));
        Ok(())
    }

    async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: &[u8],
    ) -> Result<(), BusError> {
        self.deliver(Envelope::new(subject, payload).with_reply(reply));
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        Ok(self.add_subscription(subject, None))
    }

    async fn subscribe_queue(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<Subscription, BusError> {
        Ok(self.add_subscription(subject, Some(queue_group)))
    }

    async fn request(
        &self,
        subject: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Envelope, BusError> {
        let inbox = format!("_INBOX.{}", Uuid::new_v4());
        let mut sub = self.add_subscription(&inbox, None);
        self.deliver(Envelope::new(subject, payload).with_reply(&inbox));

        match tokio::time::timeout(timeout, sub.recv()).await {
            Ok(Some(envelope)) => Ok(envelope),
            Ok(None) => Err(BusError::Closed),
            Err(_elapsed) => Err(BusError::Timeout {
                subject: subject.to_string(),
                timeout,
            }),
        }
    }

    async fn flush(&self) -> Result<(), BusError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        Ok(())
    }
}

/// Connector handing out clients of one shared in-memory broker.
///
/// The `url` argument is accepted and ignored, so harness code written
/// against [`crate::BusConnector`] runs unchanged in tests.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    bus: MemoryBus,
}

impl MemoryConnector {
    pub fn new(bus: MemoryBus) -> Self {
        Self { bus }
    }

    /// The broker behind this connector, for test assertions.
    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }
}

#[async_trait]
impl crate::BusConnector for MemoryConnector {
    type Bus = MemoryBus;

    async fn connect(&self, _url: &str) -> Result<MemoryBus, BusError> {
        Ok(self.bus.clone())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
