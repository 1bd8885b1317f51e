// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit discovery.
//!
//! A unit is one worker the supervisor manages: a `<name>.toml` file in
//! the units directory naming the executable to spawn. The file stem is
//! the service's bus name. Files that fail to parse are skipped with a
//! warning so one broken unit cannot take the fleet down.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// On-disk unit definition.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitFile {
    /// Executable to spawn.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment for the child.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A discovered unit: bus name plus its definition.
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub file: UnitFile,
}

/// Scan a directory for `*.toml` unit files, sorted by name.
pub fn discover_units(dir: &Path) -> Result<Vec<Unit>, std::io::Error> {
    let mut units = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable unit file, skipping");
                continue;
            }
        };
        match toml::from_str::<UnitFile>(&text) {
            Ok(file) => units.push(Unit {
                name: name.to_string(),
                file,
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid unit file, skipping");
            }
        }
    }

    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(units)
}

#[cfg(test)]
#[path = "unit_tests.rs"]
mod tests;
