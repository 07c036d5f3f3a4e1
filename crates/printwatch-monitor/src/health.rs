// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-device failure tracking.
//
// Kept apart from the snapshot: a failed update must leave the published
// snapshot alone, so the failure is recorded here instead. The status board
// combines both (an aging `last_updated` plus the reason it is aging).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use printwatch_core::error::HealthError;
use printwatch_core::human_errors::{FailureSummary, describe_failure};

/// Consecutive update failures after which a device is reported as failing
/// rather than flaky.
pub const FAILING_THRESHOLD: u32 = 3;

/// Health record for a single device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceHealth {
    /// Number of consecutive failed updates.
    pub consecutive_failures: u32,
    /// Why the most recent update failed (cleared on success).
    pub last_error: Option<FailureSummary>,
    /// When the most recent update failed.
    pub last_failure_at: Option<DateTime<Utc>>,
    /// When the most recent update succeeded.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Why the most recent cleanup or keep-warm run failed (cleared on success).
    pub last_remediation_error: Option<FailureSummary>,
}

impl DeviceHealth {
    /// Record a successful update.
    pub fn record_success(&mut self, device: &str, at: DateTime<Utc>) {
        if self.consecutive_failures > 0 {
            info!(
                device,
                failures = self.consecutive_failures,
                "device recovered"
            );
        }
        self.consecutive_failures = 0;
        self.last_error = None;
        self.last_success_at = Some(at);
    }

    /// Record a failed update.
    pub fn record_failure(&mut self, device: &str, error: &HealthError, at: DateTime<Utc>) {
        self.consecutive_failures += 1;
        self.last_error = Some(describe_failure(error));
        self.last_failure_at = Some(at);

        if self.consecutive_failures == FAILING_THRESHOLD {
            warn!(
                device,
                failures = self.consecutive_failures,
                "device keeps failing to update"
            );
        }
    }

    /// Record the outcome of a cleanup or keep-warm run.
    pub fn record_remediation(&mut self, error: Option<&HealthError>) {
        self.last_remediation_error = error.map(describe_failure);
    }

    /// Whether the device has failed enough updates in a row to flag it.
    pub fn is_failing(&self) -> bool {
        self.consecutive_failures >= FAILING_THRESHOLD
    }

    /// A one-line message for the status board, if anything is wrong.
    pub fn status_message(&self) -> Option<String> {
        match (&self.last_error, self.consecutive_failures) {
            (None, _) | (_, 0) => None,
            (Some(err), 1) => Some(format!("Last update failed: {}", err.summary)),
            (Some(err), n) => Some(format!("Last {n} updates failed: {}", err.summary)),
        }
    }
}
