// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for printwatch.

use thiserror::Error;

/// Top-level error type for all printwatch operations.
#[derive(Debug, Error)]
pub enum HealthError {
    // -- Per-device failures (isolated by the scheduler) --
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),

    #[error("device protocol error: {0}")]
    DeviceProtocol(String),

    #[error("job cleanup did not converge after {iterations} iterations ({deleted} jobs deleted)")]
    CleanupExhausted { iterations: u32, deleted: usize },

    #[error("keep-warm job not seen after {polls} polls")]
    KeepWarmAbandoned { polls: u32 },

    // -- Registration --
    #[error("duplicate device name: {0}")]
    DuplicateDevice(String),

    #[error("unknown device kind: {0}")]
    UnknownDeviceKind(String),

    #[error("invalid options for device {device}: {detail}")]
    InvalidDeviceOptions { device: String, detail: String },

    // -- Scheduling --
    #[error("{0} is already running")]
    Busy(String),

    // -- Configuration / startup --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HealthError {
    /// Whether this failure belongs to a single device and must be contained.
    pub fn is_device_failure(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnreachable(_)
                | Self::DeviceProtocol(_)
                | Self::CleanupExhausted { .. }
                | Self::KeepWarmAbandoned { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HealthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_failures_are_classified() {
        assert!(HealthError::DeviceUnreachable("timeout".into()).is_device_failure());
        assert!(HealthError::KeepWarmAbandoned { polls: 3 }.is_device_failure());
        assert!(!HealthError::UnknownDeviceKind("foo".into()).is_device_failure());
        assert!(!HealthError::Config("bad".into()).is_device_failure());
        assert!(!HealthError::Busy("a reconciliation cycle".into()).is_device_failure());
    }

    #[test]
    fn busy_names_the_running_work() {
        let err = HealthError::Busy("a keep-warm pass".into());
        assert_eq!(err.to_string(), "a keep-warm pass is already running");
    }

    #[test]
    fn exhausted_message_names_counts() {
        let err = HealthError::CleanupExhausted {
            iterations: 25,
            deleted: 40,
        };
        let msg = err.to_string();
        assert!(msg.contains("25 iterations"));
        assert!(msg.contains("40 jobs"));
    }
}
