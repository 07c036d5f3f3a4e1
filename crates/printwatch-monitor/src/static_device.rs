// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in `static` device kind.
//
// Reports whatever its configuration says, every time. Useful for checking a
// deployment end to end before real printers are wired in.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use printwatch_core::config::DeviceEntry;
use printwatch_core::error::{HealthError, Result};
use printwatch_core::types::{Marker, Medium, StatusMessage, StatusReport};

use crate::device::{CapabilitySet, DeviceBackend};

/// Kind identifier used in configuration files.
pub const KIND: &str = "static";

/// Options accepted in a `static` device's `options` object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticOptions {
    pub markers: Vec<Marker>,
    pub media: Vec<Medium>,
    pub status_messages: Vec<StatusMessage>,
    pub job_count: u32,
    pub ready_for_submission: bool,
    pub web_interface_uri: Option<String>,
}

/// A backend that answers every status request with the same report.
#[derive(Debug, Clone)]
pub struct StaticDevice {
    report: StatusReport,
    web_interface_uri: Option<String>,
}

impl StaticDevice {
    pub fn new(options: StaticOptions) -> Self {
        Self {
            report: StatusReport {
                markers: options.markers,
                media: options.media,
                status_messages: options.status_messages,
                job_count: options.job_count,
                ready_for_submission: options.ready_for_submission,
            },
            web_interface_uri: options.web_interface_uri,
        }
    }
}

#[async_trait]
impl DeviceBackend for StaticDevice {
    async fn fetch_status(&self) -> Result<StatusReport> {
        Ok(self.report.clone())
    }

    fn web_interface_uri(&self) -> Option<String> {
        self.web_interface_uri.clone()
    }
}

/// Constructor registered under [`KIND`].
pub fn construct(entry: &DeviceEntry) -> Result<CapabilitySet> {
    let options = if entry.options.is_null() {
        StaticOptions::default()
    } else {
        StaticOptions::deserialize(&entry.options).map_err(|e| {
            HealthError::InvalidDeviceOptions {
                device: entry.name.clone(),
                detail: e.to_string(),
            }
        })?
    };
    Ok(CapabilitySet::basic(Arc::new(StaticDevice::new(options))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use printwatch_core::types::StatusLevel;
    use serde_json::json;

    #[tokio::test]
    async fn reports_configured_values() {
        let mut entry = DeviceEntry::new("lobby", KIND);
        entry.options = json!({
            "markers": [{ "is_empty": false, "level_percent": 80.0, "description": "Black" }],
            "status_messages": [{ "level": "SoftWarning", "description": "Waste toner nearly full" }],
            "job_count": 2,
            "ready_for_submission": true,
            "web_interface_uri": "http://lobby.local/"
        });

        let caps = construct(&entry).expect("construct");
        assert!(caps.job_cleanup.is_none());
        assert!(caps.keep_warm.is_none());
        assert_eq!(
            caps.backend.web_interface_uri().as_deref(),
            Some("http://lobby.local/")
        );

        let report = caps.backend.fetch_status().await.expect("status");
        assert_eq!(report.job_count, 2);
        assert_eq!(report.markers[0].level_percent, Some(80.0));
        assert_eq!(report.status_messages[0].level, StatusLevel::SoftWarning);
    }

    #[test]
    fn missing_options_use_defaults() {
        let caps = construct(&DeviceEntry::new("lobby", KIND)).expect("construct");
        assert!(caps.backend.web_interface_uri().is_none());
    }

    #[test]
    fn bad_options_are_rejected() {
        let mut entry = DeviceEntry::new("lobby", KIND);
        entry.options = json!({ "job_count": "many" });
        let err = construct(&entry).unwrap_err();
        assert!(matches!(err, HealthError::InvalidDeviceOptions { device, .. } if device == "lobby"));
    }
}
