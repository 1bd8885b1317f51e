// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk settings document and its path-addressed mutations.
//!
//! The tree is arbitrary JSON whose root is an object keyed by service
//! names plus `global`. Updates address leaves by dotted path; list nodes
//! are traversed by parsing the segment as an index. Saves go through a
//! temp file and an atomic rename so a crash mid-write cannot corrupt the
//! document.

use chrono::Utc;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in settings store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("path '{0}' does not exist in the settings tree")]
    NoSuchPath(String),
    #[error("path '{0}' does not address a scalar leaf")]
    NotScalar(String),
    #[error("segment '{segment}' is not a valid index into the list at '{path}'")]
    BadIndex { path: String, segment: String },
    #[error("'{0}' is not a .json file inside the settings directory")]
    InvalidFilename(String),
}

/// The settings document plus its home on disk.
pub struct SettingsStore {
    path: PathBuf,
    dir: PathBuf,
    tree: Value,
}

impl SettingsStore {
    /// Load the store from `path`. A missing or unreadable document starts
    /// the store empty, matching a fresh installation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let tree = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(tree) => tree,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "settings file is not valid JSON, starting empty");
                    Value::Object(Map::new())
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "settings file not readable, starting empty");
                Value::Object(Map::new())
            }
        };

        Self { path, dir, tree }
    }

    /// The full document.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// The settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The subtree under a top-level key, or an empty object when the key
    /// is absent.
    pub fn subtree(&self, key: &str) -> Value {
        self.tree
            .get(key)
            .cloned()
            .unwrap_or(Value::Object(Map::new()))
    }

    /// Set a single scalar leaf addressed by dotted path.
    ///
    /// String values are coerced at this boundary: integer if the text
    /// parses as one, else float, else the string itself. The target must
    /// already exist and be a scalar — anything else is an error, so a
    /// mistyped path can never wipe out a subtree.
    ///
    /// Returns the effective post-coercion value. The tree is persisted
    /// before returning; an I/O failure leaves the in-memory update in
    /// place and surfaces as `StoreError::Io`.
    pub fn update_scalar(&mut self, key: &str, value: &Value) -> Result<Value, StoreError> {
        let coerced = coerce_scalar(value);

        let target = resolve_mut(&mut self.tree, key)?;
        if !is_scalar(target) {
            return Err(StoreError::NotScalar(key.to_string()));
        }
        *target = coerced.clone();

        self.persist()?;
        Ok(coerced)
    }

    /// Replace the node at `key` wholesale with `value`.
    ///
    /// Missing intermediate object nodes are created; the final segment is
    /// assigned unconditionally (into an object key or an existing list
    /// slot).
    pub fn update_block(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        let (parent_path, last) = match key.rsplit_once('.') {
            Some((head, tail)) => (Some(head), tail),
            None => (None, key),
        };

        let parent = match parent_path {
            Some(path) => resolve_mut_creating(&mut self.tree, path)?,
            None => &mut self.tree,
        };

        match parent {
            Value::Object(map) => {
                map.insert(last.to_string(), value);
            }
            Value::Array(items) => {
                let idx = parse_index(key, last, items.len())?;
                items[idx] = value;
            }
            _ => return Err(StoreError::NoSuchPath(key.to_string())),
        }

        self.persist()
    }

    /// Replace the whole document.
    ///
    /// The current file is first renamed to a timestamped `.bak` sibling,
    /// then the new tree is written in its place.
    pub fn import(&mut self, data: Value) -> Result<(), StoreError> {
        // Accept both a JSON document and a string containing one.
        let tree = match data {
            Value::String(text) => serde_json::from_str(&text)?,
            other => other,
        };

        if self.path.exists() {
            let stamp = Utc::now().format("%Y-%m-%d-%H-%M-%S");
            let backup = self.path.with_file_name(format!(
                "{}.{stamp}.bak",
                self.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "settings.json".to_string())
            ));
            fs::rename(&self.path, &backup)?;
        }

        self.tree = tree;
        self.persist()
    }

    /// Reload the document from a named file inside the settings
    /// directory. Only bare `*.json` filenames are accepted.
    pub fn load_from_file(&mut self, filename: &str) -> Result<(), StoreError> {
        if !filename.ends_with(".json")
            || filename.contains('/')
            || filename.contains("..")
        {
            return Err(StoreError::InvalidFilename(filename.to_string()));
        }

        let source = self.dir.join(filename);
        let bytes = fs::read(&source)?;
        self.tree = serde_json::from_slice(&bytes)?;
        self.persist()
    }

    /// Names of the `.json` files in the settings directory, sorted.
    pub fn list_configs(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.ends_with(".json").then_some(name)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// Write the tree back to disk: temp file, fsync, atomic rename.
    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let file = fs::File::create(&tmp_path)?;
            let mut writer = std::io::BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &self.tree)?;
            let file = writer
                .into_inner()
                .map_err(|e| StoreError::Io(e.into_error()))?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Number(_) | Value::String(_) | Value::Bool(_)
    )
}

/// Coerce a raw command value: strings become integers or floats when they
/// parse as such; everything else is used as given.
fn coerce_scalar(value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = text.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    value.clone()
}

fn parse_index(path: &str, segment: &str, len: usize) -> Result<usize, StoreError> {
    let idx: usize = segment.parse().map_err(|_| StoreError::BadIndex {
        path: path.to_string(),
        segment: segment.to_string(),
    })?;
    if idx >= len {
        return Err(StoreError::BadIndex {
            path: path.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(idx)
}

/// Walk a dotted path to an existing node.
fn resolve_mut<'a>(tree: &'a mut Value, path: &str) -> Result<&'a mut Value, StoreError> {
    let mut node = tree;
    for segment in path.split('.') {
        node = match node {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| StoreError::NoSuchPath(path.to_string()))?,
            Value::Array(items) => {
                let idx = parse_index(path, segment, items.len())?;
                &mut items[idx]
            }
            _ => return Err(StoreError::NoSuchPath(path.to_string())),
        };
    }
    Ok(node)
}

/// Walk a dotted path, creating missing object nodes on the way.
fn resolve_mut_creating<'a>(
    tree: &'a mut Value,
    path: &str,
) -> Result<&'a mut Value, StoreError> {
    let mut node = tree;
    for segment in path.split('.') {
        node = match node {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert(Value::Object(Map::new())),
            Value::Array(items) => {
                let idx = parse_index(path, segment, items.len())?;
                &mut items[idx]
            }
            _ => return Err(StoreError::NoSuchPath(path.to_string())),
        };
    }
    Ok(node)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
