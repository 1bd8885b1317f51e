// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NATS-backed bus client.
//!
//! Thin adapter over `async-nats`. Reconnection and re-establishment of
//! subscriptions after a transient disconnect are handled inside the
//! `async-nats` client; this layer only maps errors and bridges each
//! subscriber stream into the crate's single-consumer [`Subscription`]
//! queue.

use crate::{BusClient, BusError, Subscription, SUBSCRIPTION_BUFFER};
use async_trait::async_trait;
use bytes::Bytes;
use ds_core::Envelope;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Production bus client speaking the NATS wire protocol.
#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Dial the broker at `url` (`nats://host:4222`).
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    fn spawn_forwarder(
        subject: String,
        mut sub: async_nats::Subscriber,
    ) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let pattern = subject.clone();
        tokio::spawn(async move {
            while let Some(msg) = sub.next().await {
                let envelope = Envelope {
                    subject: msg.subject.to_string(),
                    payload: msg.payload.to_vec(),
                    reply: msg.reply.map(|r| r.to_string()),
                };
                // Consumer gone: stop forwarding; dropping the subscriber
                // unsubscribes on the wire.
                if tx.send(envelope).await.is_err() {
                    break;
                }
            }
            tracing::debug!(subject = %pattern, "subscription stream ended");
        });
        Subscription::new(subject, rx)
    }
}

#[async_trait]
impl BusClient for NatsBus {
    async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), BusError> {
        self.client
            .publish(subject.to_string(), Bytes::copy_from_slice(payload))
            .await
            .map_err(|e| BusError::NotConnected(e.to_string()))
    }

    async fn publish_with_reply(
        &self,
        subject: &str,
        reply: &str,
        payload: &[u8],
    ) -> Result<(), BusError> {
        self.client
            .publish_with_reply(
                subject.to_string(),
                reply.to_string(),
                Bytes::copy_from_slice(payload),
            )
            .await
            .map_err(|e| BusError::NotConnected(e.to_string()))
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        let sub = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::NotConnected(e.to_string()))?;
        Ok(Self::spawn_forwarder(subject.to_string(), sub))
    }

    async fn subscribe_queue(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<Subscription, BusError> {
        let sub = self
            .client
            .queue_subscribe(subject.to_string(), queue_group.to_string())
            .await
            .map_err(|e| BusError::NotConnected(e.to_string()))?;
        Ok(Self::spawn_forwarder(subject.to_string(), sub))
    }

    async fn request(
        &self,
        subject: &str,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Envelope, BusError> {
        let fut = self
            .client
            .request(subject.to_string(), Bytes::copy_from_slice(payload));
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(msg)) => Ok(Envelope {
                subject: msg.subject.to_string(),
                payload: msg.payload.to_vec(),
                reply: msg.reply.map(|r| r.to_string()),
            }),
            Ok(Err(e)) => Err(BusError::NotConnected(e.to_string())),
            Err(_elapsed) => Err(BusError::Timeout {
                subject: subject.to_string(),
                timeout,
            }),
        }
    }

    async fn flush(&self) -> Result<(), BusError> {
        self.client
            .flush()
            .await
            .map_err(|e| BusError::NotConnected(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.client
            .drain()
            .await
            .map_err(|e| BusError::NotConnected(e.to_string()))
    }
}
