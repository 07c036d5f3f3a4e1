// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Keep-warm protocol.
//
// Submit a no-op job, poll the device job list until it shows up, let the
// engine start on it, then delete it. If it never shows up within the poll
// budget the attempt is abandoned; the next pass submits a fresh job.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use printwatch_core::config::KeepWarmPolicy;
use printwatch_core::error::Result;
use printwatch_core::types::JobRef;

use crate::device::{KeepWarm, bounded};

/// Where a keep-warm attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum KeepWarmState {
    Idle,
    Submitted,
    Polling { polls: u32 },
    Found { job: JobRef },
    Settling { job: JobRef },
    Deleted { job: JobRef },
    PollExhausted { polls: u32 },
    Abandoned { polls: u32 },
}

impl KeepWarmState {
    /// Whether the attempt is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted { .. } | Self::Abandoned { .. })
    }
}

/// How a keep-warm attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum KeepWarmOutcome {
    /// The job was seen after `polls` polls and deleted.
    Deleted { job: JobRef, polls: u32 },
    /// The job never appeared within the poll budget.
    Abandoned { polls: u32 },
}

struct Attempt<'a> {
    device: &'a str,
    state: KeepWarmState,
}

impl Attempt<'_> {
    fn advance(&mut self, next: KeepWarmState) {
        debug!(device = self.device, from = ?self.state, to = ?next, "keep-warm transition");
        self.state = next;
    }
}

/// Run one keep-warm attempt against a device.
///
/// Device errors end the attempt immediately and are returned as-is; a job
/// that never appears is not an error.
pub async fn run_keep_warm(
    device: &str,
    target: &dyn KeepWarm,
    policy: &KeepWarmPolicy,
    timeout: Duration,
) -> Result<KeepWarmOutcome> {
    let mut attempt = Attempt {
        device,
        state: KeepWarmState::Idle,
    };

    bounded(timeout, "keep-warm submit", target.submit_warm_job(&policy.job_name)).await?;
    attempt.advance(KeepWarmState::Submitted);

    let mut polls = 0;
    let job = loop {
        polls += 1;
        attempt.advance(KeepWarmState::Polling { polls });
        if let Some(job) =
            bounded(timeout, "keep-warm poll", target.find_job(&policy.job_name)).await?
        {
            break job;
        }
        if polls >= policy.max_polls {
            attempt.advance(KeepWarmState::PollExhausted { polls });
            warn!(
                device,
                polls,
                job_name = %policy.job_name,
                "keep-warm job never appeared; abandoning"
            );
            attempt.advance(KeepWarmState::Abandoned { polls });
            return Ok(KeepWarmOutcome::Abandoned { polls });
        }
        tokio::time::sleep(policy.poll_interval()).await;
    };

    attempt.advance(KeepWarmState::Found { job: job.clone() });
    attempt.advance(KeepWarmState::Settling { job: job.clone() });
    tokio::time::sleep(policy.settle()).await;

    bounded(timeout, "keep-warm delete", target.delete_warm_job(&job)).await?;
    attempt.advance(KeepWarmState::Deleted { job: job.clone() });
    info!(device, job = %job, polls, "keep-warm job processed and removed");

    Ok(KeepWarmOutcome::Deleted { job, polls })
}
