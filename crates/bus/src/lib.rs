// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ds-bus: Subject-addressed pub/sub client for the telemetry fabric.
//!
//! Delivery is best-effort and at-most-once. Within one subject the broker
//! preserves publish order towards a given subscriber; nothing is ordered
//! across subjects. Each subscription drains through a single-consumer
//! queue, so a subscription's handler is never re-entered.

mod nats;

pub use nats::NatsBus;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod memory;
#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryBus, MemoryConnector};

use async_trait::async_trait;
use ds_core::Envelope;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from bus operations
#[derive(Debug, Error)]
pub enum BusError {
    #[error("not connected: {0}")]
    NotConnected(String),
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },
    #[error("request on {subject} timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("subscription closed")]
    Closed,
}

/// A handle to one subscription's message queue.
///
/// Messages arrive in receipt order and are consumed one at a time;
/// dropping the handle cancels the subscription.
pub struct Subscription {
    subject: String,
    rx: mpsc::Receiver<Envelope>,
}

impl Subscription {
    pub(crate) fn new(subject: String, rx: mpsc::Receiver<Envelope>) -> Self {
        Self { subject, rx }
    }

    /// The pattern this subscription was created with.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Next message, or `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

/// Client side of the subject-addressed bus.
///
/// Implementations must not block on delivery acknowledgement — slow
/// consumers drop messages rather than exerting backpressure on producers.
#[async_trait]
pub trait BusClient: Clone + Send + Sync + 'static {
    /// Publish a payload to a subject. Fire and forget.
    async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Publish carrying a reply subject, for serving request/reply
    /// endpoints by hand.
    async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: &[u8],
    ) -> Result<(), BusError>;

    /// Install a subscription for a subject pattern.
    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError>;

    /// Like [`subscribe`](Self::subscribe), but joining a queue group:
    /// each message is delivered to exactly one member of the group.
    async fn subscribe_queue(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<Subscription, BusError>;

    /// Publish and await exactly one reply on a private inbox.
    async fn request(
        &self,
        subject: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Envelope, BusError>;

    /// Flush buffered outgoing messages to the broker.
    async fn flush(&self) -> Result<(), BusError>;

    /// Drain subscriptions and close the connection.
    async fn disconnect(&self) -> Result<(), BusError>;
}

/// Dials a broker and yields a connected client.
///
/// Services go through a connector instead of a concrete client so the
/// lifecycle harness can run against the in-memory broker in tests. The
/// settings bootstrap also uses it for its short-lived connection.
#[async_trait]
pub trait BusConnector: Clone + Send + Sync + 'static {
    type Bus: BusClient;

    async fn connect(&self, url: &str) -> Result<Self::Bus, BusError>;
}

/// Connector producing [`NatsBus`] clients.
#[derive(Clone, Copy, Debug, Default)]
pub struct NatsConnector;

#[async_trait]
impl BusConnector for NatsConnector {
    type Bus = NatsBus;

    async fn connect(&self, url: &str) -> Result<NatsBus, BusError> {
        NatsBus::connect(url).await
    }
}

/// Queue capacity for each subscription's delivery channel. When a
/// subscriber falls this far behind, further messages for it are dropped.
pub(crate) const SUBSCRIPTION_BUFFER: usize = 256;
