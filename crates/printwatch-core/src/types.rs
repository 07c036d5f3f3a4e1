// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the printwatch health engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one reconciliation cycle (used in log spans).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleId(pub Uuid);

impl CycleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity of a status message, ordered by ascending urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusLevel {
    /// Informative. No action need be taken.
    Info,
    /// Nothing to do yet, but the situation may worsen.
    SoftWarning,
    /// The device might not be able to perform some of its tasks.
    HardWarning,
    /// The device cannot perform its primary task.
    Error,
}

/// A status message reported by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub description: String,
}

impl StatusMessage {
    pub fn new(level: StatusLevel, description: impl Into<String>) -> Self {
        Self {
            level,
            description: description.into(),
        }
    }
}

/// A consumable used to make marks (toner, ink).
///
/// `is_low` is present only for monitored markers and `level_percent` only for
/// measured ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub is_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_low: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_percent: Option<f32>,
    pub description: String,
    #[serde(default)]
    pub style_classes: Vec<String>,
}

/// The substrate marks are made on (paper tray, roll).
///
/// Same optional-capability layout as [`Marker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    pub is_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_low: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_percent: Option<f32>,
    pub description: String,
    #[serde(default)]
    pub style_classes: Vec<String>,
}

/// The result of one successful scrape, as produced by a device backend.
///
/// Carries no timestamp; the engine stamps it when publishing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub media: Vec<Medium>,
    #[serde(default)]
    pub status_messages: Vec<StatusMessage>,
    #[serde(default)]
    pub job_count: u32,
    #[serde(default)]
    pub ready_for_submission: bool,
}

/// The immutable, most recently published state of one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub markers: Vec<Marker>,
    pub media: Vec<Medium>,
    pub status_messages: Vec<StatusMessage>,
    pub job_count: u32,
    pub ready_for_submission: bool,
    /// `None` strictly means the device was never successfully updated.
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Build a published snapshot from a finished report.
    pub fn from_report(report: StatusReport, updated_at: DateTime<Utc>) -> Self {
        Self {
            markers: report.markers,
            media: report.media,
            status_messages: report.status_messages,
            job_count: report.job_count,
            ready_for_submission: report.ready_for_submission,
            last_updated: Some(updated_at),
        }
    }

    /// Whether the snapshot is older than `threshold` at `now`.
    ///
    /// A never-updated snapshot is always outdated.
    pub fn is_outdated(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.last_updated {
            Some(at) => now.signed_duration_since(at) > threshold,
            None => true,
        }
    }

    /// The most urgent status level currently reported, if any.
    pub fn worst_status(&self) -> Option<StatusLevel> {
        self.status_messages.iter().map(|m| m.level).max()
    }
}

/// Identifier of a job on a device, as the device names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobRef(pub String);

impl JobRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for JobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A device's failed-job listing together with its overall status code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedJobs {
    /// Overall printer status code, if the device reports one.
    pub status_code: Option<String>,
    /// Jobs the device reports as failed.
    pub jobs: Vec<JobRef>,
}

/// Which optional capabilities a registered device exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub job_cleanup: bool,
    pub keep_warm: bool,
}
