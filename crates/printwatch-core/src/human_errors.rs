// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language failure summaries for device reports.
//
// The dashboard shows the last failure next to each device. Technical errors
// are mapped to a short summary and a kind that drives how it is presented.

use serde::{Deserialize, Serialize};

use crate::error::HealthError;

/// Who has to act on a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Network blip or timeout; the next cycle retries on its own.
    Transient,
    /// The device itself is misbehaving or needs a person to look at it.
    DeviceFault,
    /// The monitor is misconfigured; nothing improves until it is fixed.
    Configuration,
}

/// A failure rendered for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Short summary (one line).
    pub summary: String,
    /// Original error text, kept for operators.
    pub detail: String,
    pub kind: FailureKind,
}

/// Convert a `HealthError` into a summary suitable for a status board.
pub fn describe_failure(err: &HealthError) -> FailureSummary {
    let detail = err.to_string();
    let (summary, kind) = match err {
        HealthError::DeviceUnreachable(inner) => describe_unreachable(inner),

        HealthError::DeviceProtocol(_) => (
            "The printer answered, but its status page could not be understood.".to_string(),
            FailureKind::DeviceFault,
        ),

        HealthError::CleanupExhausted { deleted, .. } => (
            format!("Failed jobs keep reappearing ({deleted} deleted so far)."),
            FailureKind::DeviceFault,
        ),

        HealthError::KeepWarmAbandoned { .. } => (
            "The keep-warm job never showed up in the queue.".to_string(),
            FailureKind::Transient,
        ),

        HealthError::DuplicateDevice(name) => (
            format!("Two devices are configured as \"{name}\"."),
            FailureKind::Configuration,
        ),

        HealthError::UnknownDeviceKind(kind) => (
            format!("No driver is available for device kind \"{kind}\"."),
            FailureKind::Configuration,
        ),

        HealthError::InvalidDeviceOptions { device, .. } => (
            format!("The settings for \"{device}\" are invalid."),
            FailureKind::Configuration,
        ),

        HealthError::Busy(what) => (
            format!("Try again shortly: {what} is already running."),
            FailureKind::Transient,
        ),

        HealthError::Config(_) => (
            "The monitor configuration is invalid.".to_string(),
            FailureKind::Configuration,
        ),

        HealthError::Io(_) => (
            "A local file could not be read or written.".to_string(),
            FailureKind::Configuration,
        ),

        HealthError::Serialization(_) => (
            "A configuration or data file is malformed.".to_string(),
            FailureKind::Configuration,
        ),
    };

    FailureSummary {
        summary,
        detail,
        kind,
    }
}

fn describe_unreachable(detail: &str) -> (String, FailureKind) {
    let lower = detail.to_ascii_lowercase();

    let summary = if lower.contains("timed out") {
        "The printer didn't respond in time."
    } else if lower.contains("connection refused") {
        "The printer refused the connection."
    } else if lower.contains("dns") || lower.contains("resolve") {
        "The printer's address could not be resolved."
    } else {
        "The printer could not be reached."
    };

    (summary.to_string(), FailureKind::Transient)
}
