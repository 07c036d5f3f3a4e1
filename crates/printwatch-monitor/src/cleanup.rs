// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Failed-job cleanup loop.
//
// Deleting a failed job can make the device reveal the next one, so cleanup
// repeats until a query comes back empty: query, delete everything found,
// wait the pacing interval, query again. A device status code on the
// non-error list (a paper jam) means the "failed" jobs are waiting on a
// person, not broken, and the round counts as empty.

use std::time::Duration;

use tracing::{debug, info, warn};

use printwatch_core::config::CleanupPolicy;
use printwatch_core::error::{HealthError, Result};
use printwatch_core::types::JobRef;

use crate::device::{JobCleanup, bounded};

/// What one cleanup invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Queries made, including the final clean one.
    pub iterations: u32,
    /// Jobs deleted, in deletion order.
    pub deleted: Vec<JobRef>,
    /// Pacing waits between rounds.
    pub pacing_sleeps: u32,
    /// Status code that suppressed cleanup on the final round, if any.
    pub suppressed_by: Option<String>,
}

/// Delete failed jobs on one device until its queue reports clean.
///
/// Every device call is bounded by `timeout`. If `policy.max_iterations` rounds
/// of deletions do not empty the queue, returns `CleanupExhausted`.
pub async fn run_cleanup(
    device: &str,
    target: &dyn JobCleanup,
    policy: &CleanupPolicy,
    timeout: Duration,
) -> Result<CleanupReport> {
    bounded(timeout, "session setup", target.open_session()).await?;

    let mut report = CleanupReport::default();
    loop {
        report.iterations += 1;
        let listing = bounded(timeout, "failed-job query", target.failed_jobs()).await?;

        let jobs = match listing.status_code {
            Some(code) if policy.is_non_error_status(&code) => {
                if !listing.jobs.is_empty() {
                    debug!(
                        device,
                        status = %code,
                        jobs = listing.jobs.len(),
                        "device status is not a job fault; leaving jobs alone"
                    );
                }
                report.suppressed_by = Some(code);
                Vec::new()
            }
            _ => listing.jobs,
        };

        if jobs.is_empty() {
            debug!(
                device,
                iterations = report.iterations,
                deleted = report.deleted.len(),
                "job queue clean"
            );
            return Ok(report);
        }

        for job in jobs {
            info!(device, job = %job, "deleting failed job");
            bounded(timeout, "job deletion", target.delete_failed_job(&job)).await?;
            report.deleted.push(job);
        }

        if policy
            .max_iterations
            .is_some_and(|max| report.iterations >= max)
        {
            warn!(
                device,
                iterations = report.iterations,
                deleted = report.deleted.len(),
                "failed jobs keep reappearing; giving up for this cycle"
            );
            return Err(HealthError::CleanupExhausted {
                iterations: report.iterations,
                deleted: report.deleted.len(),
            });
        }

        tokio::time::sleep(policy.pacing()).await;
        report.pacing_sleeps += 1;
    }
}
