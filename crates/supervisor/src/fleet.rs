// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fleet: managed service records and their child processes.
//!
//! Each discovered unit gets one [`ManagedService`] record living from
//! supervisor startup to teardown. Spawning redirects the child's stdout
//! and stderr into `logs/<unit>.log`, owned by the supervisor for the
//! child's lifetime. Stopping is polite first: SIGTERM, a graceful
//! window, then SIGKILL. The monitor pass tells operator stops apart from
//! crashes by the last issued command and restarts crash victims up to a
//! bounded retry count.

use crate::unit::Unit;
use ds_core::{FleetSnapshot, LastCommand, ServiceRecord, ServiceStatus};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

/// Errors from fleet operations
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown service: {0}")]
    UnknownService(String),
}

/// Fleet tuning knobs.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Automatic restarts per service before quarantine in `error`.
    pub max_retries: u32,
    /// Window between SIGTERM and SIGKILL on stop.
    pub graceful_timeout: Duration,
    /// Delay after starting the settings service before the rest of the
    /// fleet, so their settings requests can be served.
    pub settings_warmup: Duration,
    /// Monitor pass period.
    pub monitor_interval: Duration,
    /// Directory receiving per-unit log files.
    pub logs_dir: PathBuf,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            graceful_timeout: Duration::from_secs(5),
            settings_warmup: Duration::from_secs(2),
            monitor_interval: Duration::from_secs(2),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

/// One managed worker: its unit, live status, and child handle.
pub struct ManagedService {
    pub unit: Unit,
    pub status: ServiceStatus,
    pub last_command: LastCommand,
    pub restart_count: u32,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    child: Option<Child>,
}

impl ManagedService {
    fn new(unit: Unit) -> Self {
        Self {
            unit,
            status: ServiceStatus::Stopped,
            last_command: LastCommand::None,
            restart_count: 0,
            pid: None,
            exit_code: None,
            child: None,
        }
    }

    fn record(&self) -> ServiceRecord {
        ServiceRecord {
            name: self.unit.name.clone(),
            status: self.status,
            pid: self.pid,
            last_command: self.last_command,
            restart_count: self.restart_count,
            exit_code: self.exit_code,
        }
    }

    fn is_alive(&self) -> bool {
        self.child.is_some() && self.status.is_running()
    }
}

/// The supervisor's service table.
pub struct Fleet {
    config: FleetConfig,
    services: IndexMap<String, ManagedService>,
}

impl Fleet {
    /// Build the table from discovered units. Records are created once
    /// here and live until teardown.
    pub fn new(units: Vec<Unit>, config: FleetConfig) -> Self {
        let services = units
            .into_iter()
            .map(|unit| (unit.name.clone(), ManagedService::new(unit)))
            .collect();
        Self { config, services }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Unit names in discovery order.
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn status_of(&self, name: &str) -> Option<ServiceStatus> {
        self.services.get(name).map(|s| s.status)
    }

    pub fn restart_count_of(&self, name: &str) -> Option<u32> {
        self.services.get(name).map(|s| s.restart_count)
    }

    /// Spawn a service. A user-initiated start resets the restart count;
    /// a spawn failure quarantines the record in `error`.
    pub fn start_service(&mut self, name: &str) -> Result<(), SupervisorError> {
        let logs_dir = self.config.logs_dir.clone();
        let service = self
            .services
            .get_mut(name)
            .ok_or_else(|| SupervisorError::UnknownService(name.to_string()))?;

        if service.is_alive() {
            info!(service = name, "already running");
            return Ok(());
        }

        service.last_command = LastCommand::Start;
        service.restart_count = 0;
        service.status = ServiceStatus::Starting;
        spawn_child(&logs_dir, service);
        Ok(())
    }

    /// Stop a service: SIGTERM, wait out the graceful window, SIGKILL.
    pub async fn stop_service(&mut self, name: &str) -> Result<(), SupervisorError> {
        let graceful = self.config.graceful_timeout;
        let service = self
            .services
            .get_mut(name)
            .ok_or_else(|| SupervisorError::UnknownService(name.to_string()))?;

        service.last_command = LastCommand::Stop;

        let Some(mut child) = service.child.take() else {
            service.status = ServiceStatus::Stopped;
            service.pid = None;
            return Ok(());
        };

        service.status = ServiceStatus::Stopping;
        info!(service = name, pid = ?service.pid, "stopping service");

        if let Some(pid) = child.id() {
            let _ = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid as i32),
                nix::sys::signal::Signal::SIGTERM,
            );
        }

        match tokio::time::timeout(graceful, child.wait()).await {
            Ok(Ok(status)) => {
                info!(service = name, code = ?status.code(), "service stopped");
            }
            Ok(Err(e)) => {
                warn!(service = name, error = %e, "wait after SIGTERM failed");
            }
            Err(_elapsed) => {
                warn!(
                    service = name,
                    timeout = ?graceful,
                    "service ignored SIGTERM, killing"
                );
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }

        service.status = ServiceStatus::Stopped;
        service.pid = None;
        Ok(())
    }

    pub async fn restart_service(&mut self, name: &str) -> Result<(), SupervisorError> {
        self.stop_service(name).await?;
        self.start_service(name)
    }

    /// Start every service. The settings service goes first, followed by
    /// a warm-up delay so the rest of the fleet can fetch settings on
    /// their first try.
    pub async fn start_all(&mut self) {
        let names = self.service_names();
        let settings_unit = names.iter().find(|n| is_settings_unit(n)).cloned();

        if let Some(settings) = settings_unit {
            if let Err(e) = self.start_service(&settings) {
                error!(service = %settings, error = %e, "failed to start settings service");
            }
            tokio::time::sleep(self.config.settings_warmup).await;
        }

        for name in names {
            if is_settings_unit(&name) {
                continue;
            }
            if let Err(e) = self.start_service(&name) {
                error!(service = %name, error = %e, "failed to start service");
            }
        }
    }

    /// Stop every service that has a live child. Order unspecified.
    pub async fn stop_all(&mut self) {
        for name in self.service_names() {
            if let Err(e) = self.stop_service(&name).await {
                error!(service = %name, error = %e, "failed to stop service");
            }
        }
    }

    /// One monitor pass: reap exited children, restart crash victims up
    /// to the retry cap. Returns true when any status changed.
    pub fn poll(&mut self) -> bool {
        let logs_dir = self.config.logs_dir.clone();
        let max_retries = self.config.max_retries;
        let mut changed = false;

        for service in self.services.values_mut() {
            if !service.status.is_running() {
                continue;
            }
            let Some(child) = service.child.as_mut() else {
                continue;
            };

            let exit = match child.try_wait() {
                Ok(Some(status)) => status,
                Ok(None) => continue,
                Err(e) => {
                    warn!(service = %service.unit.name, error = %e, "child poll failed");
                    continue;
                }
            };

            let code = exit_code(&exit);
            let name = service.unit.name.clone();
            service.child = None;
            service.pid = None;
            service.exit_code = Some(code);
            changed = true;

            if service.last_command == LastCommand::Stop {
                // Operator asked for this; a clean end, not a crash.
                info!(service = %name, code, "service terminated after stop");
                service.status = ServiceStatus::Stopped;
                continue;
            }

            service.status = ServiceStatus::Crashed;
            warn!(service = %name, code, "service crashed");

            if service.restart_count < max_retries {
                service.restart_count += 1;
                service.status = ServiceStatus::Restarting;
                info!(
                    service = %name,
                    attempt = service.restart_count,
                    of = max_retries,
                    "restarting crashed service"
                );
                spawn_child(&logs_dir, service);
            } else {
                error!(
                    service = %name,
                    retries = max_retries,
                    "restart cap reached, giving up"
                );
                service.status = ServiceStatus::Error;
            }
        }

        changed
    }

    /// The publishable view of the fleet.
    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot::from_records(self.services.values().map(ManagedService::record).collect())
    }
}

/// Spawn the unit's command with output redirected to its log file.
/// Mutates the record in place: `running` with a pid on success, `error`
/// on spawn failure.
fn spawn_child(logs_dir: &std::path::Path, service: &mut ManagedService) {
    let name = service.unit.name.clone();

    let log = match open_log(logs_dir, &name) {
        Ok(log) => log,
        Err(e) => {
            error!(service = %name, error = %e, "cannot open log file");
            service.status = ServiceStatus::Error;
            return;
        }
    };
    let stderr_log = match log.try_clone() {
        Ok(clone) => clone,
        Err(e) => {
            error!(service = %name, error = %e, "cannot clone log handle");
            service.status = ServiceStatus::Error;
            return;
        }
    };

    let mut command = Command::new(&service.unit.file.command);
    command
        .args(&service.unit.file.args)
        .envs(service.unit.file.env.clone())
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(stderr_log))
        .kill_on_drop(true);

    match command.spawn() {
        Ok(child) => {
            service.pid = child.id();
            service.exit_code = None;
            service.child = Some(child);
            service.status = ServiceStatus::Running;
            info!(service = %name, pid = ?service.pid, "service started");
        }
        Err(e) => {
            error!(service = %name, error = %e, "spawn failed");
            service.status = ServiceStatus::Error;
        }
    }
}

fn open_log(logs_dir: &std::path::Path, name: &str) -> std::io::Result<std::fs::File> {
    std::fs::create_dir_all(logs_dir)?;
    std::fs::File::create(logs_dir.join(format!("{name}.log")))
}

/// Exit code of a reaped child; signal terminations map to the negated
/// signal number, mirroring the convention operators read in snapshots.
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .unwrap_or_else(|| -status.signal().unwrap_or(0))
}

/// The unit whose presence gates the warm-up ordering in `start_all`.
fn is_settings_unit(name: &str) -> bool {
    name == "settings_service"
}

#[cfg(test)]
#[path = "fleet_tests.rs"]
mod tests;
