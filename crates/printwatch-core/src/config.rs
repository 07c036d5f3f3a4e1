// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Monitor configuration.
//
// Loaded from a JSON file by the daemon; the engine only reads the resolved
// values. All durations are stored as whole seconds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HealthError, Result};

/// Printer status code for a physical paper jam. Not a job-queue fault.
pub const PAPER_JAM_STATUS_CODE: &str = "140005";

/// Pacing and bounds for the job-cleanup loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupPolicy {
    /// Seconds to wait after a round of deletions before re-checking.
    pub pacing_secs: u64,
    /// Maximum rounds of deletions per invocation. `None` loops until the
    /// queue reports clean.
    pub max_iterations: Option<u32>,
    /// Device status codes during which failed-looking jobs are left alone.
    pub non_error_status_codes: Vec<String>,
}

impl CleanupPolicy {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }

    /// Whether the device status code suppresses cleanup for this round.
    pub fn is_non_error_status(&self, code: &str) -> bool {
        self.non_error_status_codes.iter().any(|c| c == code)
    }
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            pacing_secs: 30,
            max_iterations: Some(25),
            non_error_status_codes: vec![PAPER_JAM_STATUS_CODE.to_string()],
        }
    }
}

/// Timing and budget for the keep-warm protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepWarmPolicy {
    /// Seconds between unsuccessful polls for the submitted job.
    pub poll_interval_secs: u64,
    /// Polls before the attempt is abandoned.
    pub max_polls: u32,
    /// Seconds to let the engine start processing before deleting the job.
    pub settle_secs: u64,
    /// Job name used to find the submitted job in the device's job list.
    pub job_name: String,
}

impl KeepWarmPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl Default for KeepWarmPolicy {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_polls: 30,
            settle_secs: 2,
            job_name: "KEEPWARM".into(),
        }
    }
}

/// One configured device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Unique display name.
    pub name: String,
    /// Device kind identifier, resolved through the kind registry.
    pub kind: String,
    /// Backend-specific options, passed through untouched.
    #[serde(default)]
    pub options: serde_json::Value,
    /// Overrides the global per-operation timeout for this device.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Set to false to disable job cleanup even if the backend supports it.
    #[serde(default = "enabled")]
    pub job_cleanup: bool,
    /// Set to false to disable keep-warm even if the backend supports it.
    #[serde(default = "enabled")]
    pub keep_warm: bool,
}

fn enabled() -> bool {
    true
}

impl DeviceEntry {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            options: serde_json::Value::Null,
            timeout_secs: None,
            job_cleanup: true,
            keep_warm: true,
        }
    }
}

/// Top-level monitor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between reconciliation cycles.
    pub update_interval_secs: u64,
    /// Seconds after which a snapshot is reported as outdated.
    pub outdated_after_secs: u64,
    /// Seconds between keep-warm passes.
    pub keep_warm_interval_secs: u64,
    /// Whether the daemon starts the keep-warm task.
    pub keep_warm_enabled: bool,
    /// Default timeout for each network operation against a device.
    pub device_timeout_secs: u64,
    pub cleanup: CleanupPolicy,
    pub keep_warm: KeepWarmPolicy,
    pub devices: Vec<DeviceEntry>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 300,
            outdated_after_secs: 900,
            keep_warm_interval_secs: 1800,
            keep_warm_enabled: true,
            device_timeout_secs: 10,
            cleanup: CleanupPolicy::default(),
            keep_warm: KeepWarmPolicy::default(),
            devices: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Read, parse, and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            HealthError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.update_interval_secs == 0 {
            return Err(HealthError::Config("update_interval_secs must be positive".into()));
        }
        if self.keep_warm_enabled && self.keep_warm_interval_secs == 0 {
            return Err(HealthError::Config(
                "keep_warm_interval_secs must be positive".into(),
            ));
        }
        if self.device_timeout_secs == 0 {
            return Err(HealthError::Config("device_timeout_secs must be positive".into()));
        }
        if self.cleanup.max_iterations == Some(0) {
            return Err(HealthError::Config(
                "cleanup.max_iterations must be positive or null".into(),
            ));
        }
        if self.keep_warm.max_polls == 0 {
            return Err(HealthError::Config("keep_warm.max_polls must be positive".into()));
        }
        if self.keep_warm.job_name.trim().is_empty() {
            return Err(HealthError::Config("keep_warm.job_name must not be empty".into()));
        }
        for entry in &self.devices {
            if entry.name.trim().is_empty() {
                return Err(HealthError::Config("device with empty name".into()));
            }
            if entry.kind.trim().is_empty() {
                return Err(HealthError::Config(format!(
                    "device {} has no kind",
                    entry.name
                )));
            }
            if entry.timeout_secs == Some(0) {
                return Err(HealthError::Config(format!(
                    "device {} has a zero timeout",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn keep_warm_interval(&self) -> Duration {
        Duration::from_secs(self.keep_warm_interval_secs)
    }

    pub fn outdated_after(&self) -> Duration {
        Duration::from_secs(self.outdated_after_secs)
    }

    /// Effective network timeout for a device entry.
    pub fn timeout_for(&self, entry: &DeviceEntry) -> Duration {
        Duration::from_secs(entry.timeout_secs.unwrap_or(self.device_timeout_secs))
    }
}
