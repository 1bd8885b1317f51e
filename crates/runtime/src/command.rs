// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command decoding for the `commands.<service>` subject.
//!
//! A command is a JSON object with a `command` field naming the operation
//! plus named arguments. Each service declares its command set as an enum
//! tagged with `command` and matches it exhaustively; this module does the
//! two-phase decode so the service loop can distinguish a malformed
//! message (warn and drop) from an unknown command (warn, and answer the
//! reply subject with a structured error when one is present). Fields a
//! handler does not know are ignored.

use ds_core::Envelope;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from command decoding
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("payload is not a JSON object: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("message has no 'command' field")]
    MissingCommand,
    #[error("unknown command '{name}': {reason}")]
    Unknown { name: String, reason: String },
}

/// A command message after the first decode phase: the operation name is
/// known, arguments are still raw JSON.
#[derive(Debug, Clone)]
pub struct RawCommand {
    pub name: String,
    /// The full payload object, `command` tag included.
    pub body: Value,
    /// Reply subject from the envelope, when the sender wants an answer.
    pub reply: Option<String>,
}

impl RawCommand {
    /// Second decode phase: deserialize into the service's tagged command
    /// enum. Failures are reported as [`CommandError::Unknown`] carrying
    /// the operation name, since the tag itself already parsed.
    pub fn decode<C: DeserializeOwned>(&self) -> Result<C, CommandError> {
        serde_json::from_value(self.body.clone()).map_err(|e| CommandError::Unknown {
            name: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

/// First decode phase: parse the envelope payload and extract `command`.
pub fn parse_command(envelope: &Envelope) -> Result<RawCommand, CommandError> {
    let body: Value =
        serde_json::from_slice(&envelope.payload).map_err(CommandError::Malformed)?;
    let name = body
        .get("command")
        .and_then(Value::as_str)
        .ok_or(CommandError::MissingCommand)?
        .to_string();
    Ok(RawCommand {
        name,
        body,
        reply: envelope.reply.clone(),
    })
}

/// Structured acknowledgement handlers publish to a reply subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    pub status: AckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Ok,
    Error,
}

impl CommandAck {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Error,
            message: message.into(),
        }
    }

    /// Serialized form; infallible for this shape.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| b"{\"status\":\"error\"}".to_vec())
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
