// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed view over the hierarchical settings document.
//!
//! Every service receives its settings as an arbitrary JSON tree. This view
//! resolves dotted paths (`global.nats_url`) and coerces leaves at the
//! boundary, so call sites never re-interpret raw values.

use serde_json::Value;

/// Bus URL used when the document carries no `global.nats_url`.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// Read-only view over a settings document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsDoc {
    root: Value,
}

impl SettingsDoc {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Parse a document from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_slice(bytes)?))
    }

    /// The underlying tree.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve a dotted path against the tree. List nodes are indexed by
    /// parsing the segment as an integer.
    pub fn at(&self, path: &str) -> Option<&Value> {
        let mut node = &self.root;
        for segment in path.split('.') {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.at(path)?.as_str()
    }

    pub fn f64_at(&self, path: &str) -> Option<f64> {
        self.at(path)?.as_f64()
    }

    pub fn u64_at(&self, path: &str) -> Option<u64> {
        self.at(path)?.as_u64()
    }

    pub fn bool_at(&self, path: &str) -> Option<bool> {
        self.at(path)?.as_bool()
    }

    /// The bus URL every service dials, falling back to the hard-wired
    /// default.
    pub fn nats_url(&self) -> &str {
        self.str_at("global.nats_url").unwrap_or(DEFAULT_NATS_URL)
    }

    /// Seconds between periodic emissions for a service, when configured.
    pub fn update_interval(&self, service: &str) -> Option<f64> {
        self.f64_at(&format!("{service}.update_interval"))
    }
}

impl From<Value> for SettingsDoc {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

#[cfg(test)]
#[path = "settings_doc_tests.rs"]
mod tests;
