// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device capability model.
//
// A vendor backend implements `DeviceBackend` (required) and, if the device
// supports it, `JobCleanup` and/or `KeepWarm`. The backend hands its
// capabilities over once, as a `CapabilitySet`, when it is registered; the
// engine never checks for them again.
//
// `MonitoredDevice` wraps a capability set with the published snapshot, the
// per-device network timeout, and the failure record.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use printwatch_core::config::{CleanupPolicy, KeepWarmPolicy};
use printwatch_core::error::{HealthError, Result};
use printwatch_core::types::{
    CapabilityFlags, FailedJobs, JobRef, Marker, Medium, Snapshot, StatusMessage, StatusReport,
};

use crate::cleanup::{CleanupReport, run_cleanup};
use crate::health::DeviceHealth;
use crate::keep_warm::{KeepWarmOutcome, run_keep_warm};
use crate::snapshot::SnapshotCell;

/// The contract every device backend must satisfy.
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// Scrape the device and return a finished report.
    ///
    /// Fails with `DeviceUnreachable` when the device cannot be contacted and
    /// `DeviceProtocol` when its answer cannot be interpreted.
    async fn fetch_status(&self) -> Result<StatusReport>;

    /// Link to the device's own web interface, if it has one.
    fn web_interface_uri(&self) -> Option<String> {
        None
    }
}

/// Optional capability: remove failed jobs stuck in the device queue.
#[async_trait]
pub trait JobCleanup: Send + Sync {
    /// Log in or otherwise set up a session before the queue is queried.
    async fn open_session(&self) -> Result<()>;

    /// The device's overall status code and the jobs it reports as failed.
    async fn failed_jobs(&self) -> Result<FailedJobs>;

    /// Ask the device to delete one failed job.
    async fn delete_failed_job(&self, job: &JobRef) -> Result<()>;
}

/// Optional capability: run a no-op job to keep the print engine warm.
#[async_trait]
pub trait KeepWarm: Send + Sync {
    /// Upload a minimal job that engages the engine without producing output.
    async fn submit_warm_job(&self, job_name: &str) -> Result<()>;

    /// Look for a job with the given name in the device's job list.
    async fn find_job(&self, job_name: &str) -> Result<Option<JobRef>>;

    /// Remove the warm-up job.
    async fn delete_warm_job(&self, job: &JobRef) -> Result<()>;
}

/// Everything a backend can do, fixed at registration.
#[derive(Clone)]
pub struct CapabilitySet {
    pub backend: Arc<dyn DeviceBackend>,
    pub job_cleanup: Option<Arc<dyn JobCleanup>>,
    pub keep_warm: Option<Arc<dyn KeepWarm>>,
}

impl CapabilitySet {
    /// A device that only reports status.
    pub fn basic(backend: Arc<dyn DeviceBackend>) -> Self {
        Self {
            backend,
            job_cleanup: None,
            keep_warm: None,
        }
    }

    pub fn with_job_cleanup(mut self, cleanup: Arc<dyn JobCleanup>) -> Self {
        self.job_cleanup = Some(cleanup);
        self
    }

    pub fn with_keep_warm(mut self, keep_warm: Arc<dyn KeepWarm>) -> Self {
        self.keep_warm = Some(keep_warm);
        self
    }

    pub fn flags(&self) -> CapabilityFlags {
        CapabilityFlags {
            job_cleanup: self.job_cleanup.is_some(),
            keep_warm: self.keep_warm.is_some(),
        }
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("flags", &self.flags())
            .finish()
    }
}

/// Run one device network operation under a deadline.
///
/// Expiry is reported as `DeviceUnreachable`, like any other failure to reach
/// the device.
pub async fn bounded<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(HealthError::DeviceUnreachable(format!(
            "{operation} timed out after {timeout:?}"
        ))),
    }
}

/// A registered device: capabilities plus published state.
pub struct MonitoredDevice {
    name: String,
    capabilities: CapabilitySet,
    timeout: Duration,
    snapshot: SnapshotCell,
    health: Mutex<DeviceHealth>,
}

impl MonitoredDevice {
    pub fn new(name: impl Into<String>, capabilities: CapabilitySet, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            capabilities,
            timeout,
            snapshot: SnapshotCell::new(),
            health: Mutex::new(DeviceHealth::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> CapabilityFlags {
        self.capabilities.flags()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn web_interface_uri(&self) -> Option<String> {
        self.capabilities.backend.web_interface_uri()
    }

    /// Refresh from the physical device and publish the result.
    ///
    /// On failure the previously published snapshot stays untouched.
    #[instrument(skip(self), fields(device = %self.name))]
    pub async fn update(&self) -> Result<()> {
        let fetched = bounded(
            self.timeout,
            "status update",
            self.capabilities.backend.fetch_status(),
        )
        .await;

        let now = Utc::now();
        match fetched {
            Ok(report) => {
                self.snapshot.publish(Snapshot::from_report(report, now));
                self.with_health(|h| h.record_success(&self.name, now));
                debug!("snapshot published");
                Ok(())
            }
            Err(e) => {
                self.with_health(|h| h.record_failure(&self.name, &e, now));
                Err(e)
            }
        }
    }

    /// Delete failed jobs until the queue is clean.
    ///
    /// Returns `None` if the device does not support job cleanup.
    #[instrument(skip(self, policy), fields(device = %self.name))]
    pub async fn cleanup_broken_jobs(&self, policy: &CleanupPolicy) -> Option<Result<CleanupReport>> {
        let target = self.capabilities.job_cleanup.as_ref()?;
        let result = run_cleanup(&self.name, target.as_ref(), policy, self.timeout).await;
        self.with_health(|h| h.record_remediation(result.as_ref().err()));
        Some(result)
    }

    /// Run one keep-warm submit/poll/delete round.
    ///
    /// Returns `None` if the device does not support keep-warm.
    #[instrument(skip(self, policy), fields(device = %self.name))]
    pub async fn keep_warm(&self, policy: &KeepWarmPolicy) -> Option<Result<KeepWarmOutcome>> {
        let target = self.capabilities.keep_warm.as_ref()?;
        let result = run_keep_warm(&self.name, target.as_ref(), policy, self.timeout).await;
        match &result {
            Ok(KeepWarmOutcome::Deleted { .. }) => self.with_health(|h| h.record_remediation(None)),
            Ok(KeepWarmOutcome::Abandoned { polls }) => {
                let abandoned = HealthError::KeepWarmAbandoned { polls: *polls };
                self.with_health(|h| h.record_remediation(Some(&abandoned)));
            }
            Err(e) => self.with_health(|h| h.record_remediation(Some(e))),
        }
        Some(result)
    }

    // -- Read accessors (never wait on device I/O) --------------------------

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.snapshot.load().markers.clone()
    }

    pub fn media(&self) -> Vec<Medium> {
        self.snapshot.load().media.clone()
    }

    pub fn status_messages(&self) -> Vec<StatusMessage> {
        self.snapshot.load().status_messages.clone()
    }

    pub fn job_count(&self) -> u32 {
        self.snapshot.load().job_count
    }

    pub fn ready_for_submission(&self) -> bool {
        self.snapshot.load().ready_for_submission
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshot.load().last_updated
    }

    /// A copy of the device's failure record.
    pub fn health(&self) -> DeviceHealth {
        self.health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_health(&self, f: impl FnOnce(&mut DeviceHealth)) {
        let mut health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut health);
    }
}

impl std::fmt::Debug for MonitoredDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoredDevice")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities.flags())
            .field("timeout", &self.timeout)
            .finish()
    }
}
