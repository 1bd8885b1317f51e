// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed-service records and the fleet snapshot published by the
//! supervisor.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a managed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Crashed,
    /// Crashed and being brought back up by the monitor loop.
    Restarting,
    /// Give-up state: spawn failed or the restart cap was reached.
    /// No further automatic restarts.
    Error,
}

impl ServiceStatus {
    pub fn is_running(self) -> bool {
        matches!(self, ServiceStatus::Running)
    }
}

/// Last lifecycle command issued for a service.
///
/// The monitor loop uses this to tell an operator-initiated stop apart
/// from a crash: a child that exits after `stop` terminated normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastCommand {
    Start,
    Stop,
    #[default]
    None,
}

/// Serializable view of a managed service, without the process handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub last_command: LastCommand,
    pub restart_count: u32,
    /// Exit code of the most recent crash, when known. Negative codes
    /// denote termination by signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Aggregate health of the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalStatus {
    AllOk,
    Degraded,
}

/// Snapshot of every managed service, published on `manager.status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub global_status: GlobalStatus,
    pub services: Vec<ServiceRecord>,
}

impl FleetSnapshot {
    /// Build a snapshot; `global_status` is `all_ok` iff every record is
    /// `running`.
    pub fn from_records(services: Vec<ServiceRecord>) -> Self {
        let all_ok = services.iter().all(|s| s.status.is_running());
        Self {
            global_status: if all_ok {
                GlobalStatus::AllOk
            } else {
                GlobalStatus::Degraded
            },
            services,
        }
    }
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
