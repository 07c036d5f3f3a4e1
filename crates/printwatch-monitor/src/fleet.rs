// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The fleet: every registered device, in name order.
//
// The device list is fixed once the fleet is built. Afterwards the only thing
// that changes at runtime is each device's own snapshot and health record.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use printwatch_core::config::MonitorConfig;
use printwatch_core::error::{HealthError, Result};
use printwatch_core::types::{CapabilityFlags, Snapshot, StatusLevel};

use crate::device::{CapabilitySet, MonitoredDevice};
use crate::health::DeviceHealth;
use crate::registry::DeviceKinds;

/// Collects devices and rejects duplicate names.
#[derive(Debug, Default)]
pub struct FleetBuilder {
    devices: BTreeMap<String, Arc<MonitoredDevice>>,
}

impl FleetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    /// Add a device. A name that is already taken is refused and the first
    /// registration stays.
    pub fn register(&mut self, device: MonitoredDevice) -> Result<()> {
        if self.devices.contains_key(device.name()) {
            return Err(HealthError::DuplicateDevice(device.name().to_string()));
        }
        self.devices
            .insert(device.name().to_string(), Arc::new(device));
        Ok(())
    }

    pub fn build(self) -> Fleet {
        Fleet {
            devices: self.devices.into_values().collect(),
        }
    }
}

/// Everything the dashboard needs to show one device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub name: String,
    pub capabilities: CapabilityFlags,
    pub snapshot: Arc<Snapshot>,
    /// True if the snapshot was never published or is older than the
    /// configured threshold.
    pub outdated: bool,
    /// Most urgent level among the snapshot's status messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_status: Option<StatusLevel>,
    pub health: DeviceHealth,
    /// Recent update failures, as one line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_interface_uri: Option<String>,
}

/// The registered devices, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    devices: Vec<Arc<MonitoredDevice>>,
}

impl Fleet {
    /// Build the fleet described by a configuration.
    ///
    /// Duplicate names are logged and skipped. An unknown kind or invalid
    /// device options fail the whole build.
    pub fn from_config(config: &MonitorConfig, kinds: &DeviceKinds) -> Result<Self> {
        let mut builder = FleetBuilder::new();

        for entry in &config.devices {
            if builder.contains(&entry.name) {
                error!(device = %entry.name, "duplicate device name; skipping entry");
                continue;
            }

            let mut capabilities: CapabilitySet = kinds.construct(entry)?;
            if !entry.job_cleanup {
                capabilities.job_cleanup = None;
            }
            if !entry.keep_warm {
                capabilities.keep_warm = None;
            }

            let device = MonitoredDevice::new(&entry.name, capabilities, config.timeout_for(entry));
            info!(
                device = %entry.name,
                kind = %entry.kind,
                job_cleanup = device.capabilities().job_cleanup,
                keep_warm = device.capabilities().keep_warm,
                "device registered"
            );
            builder.register(device)?;
        }

        Ok(builder.build())
    }

    pub fn devices(&self) -> &[Arc<MonitoredDevice>] {
        &self.devices
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MonitoredDevice>> {
        self.devices
            .binary_search_by(|d| d.name().cmp(name))
            .ok()
            .map(|i| &self.devices[i])
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Current snapshot of every device. Never waits on device I/O.
    pub fn snapshots(&self) -> Vec<(String, Arc<Snapshot>)> {
        self.devices
            .iter()
            .map(|d| (d.name().to_string(), d.snapshot()))
            .collect()
    }

    /// Status board rows for every device.
    pub fn reports(&self, now: DateTime<Utc>, outdated_after: Duration) -> Vec<DeviceReport> {
        let threshold = chrono::Duration::from_std(outdated_after)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        self.devices
            .iter()
            .map(|d| {
                let snapshot = d.snapshot();
                let health = d.health();
                DeviceReport {
                    name: d.name().to_string(),
                    capabilities: d.capabilities(),
                    outdated: snapshot.is_outdated(now, threshold),
                    worst_status: snapshot.worst_status(),
                    snapshot,
                    problem: health.status_message(),
                    health,
                    web_interface_uri: d.web_interface_uri(),
                }
            })
            .collect()
    }
}
