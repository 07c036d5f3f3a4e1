// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconciliation and keep-warm schedulers.
//
// Both run on a fixed period with the first run immediately. A tick that comes
// due while the previous run is still going is dropped, never queued: each
// scheduler owns a mutex that a run holds for its whole duration, and a tick
// only starts a run if `try_lock` succeeds.
//
// Shutdown cancels the ticker, then waits for the mutex. A run in flight
// checks for cancellation between devices, so it stops after the device it is
// currently working on. Every `start()` gets its own token, so a scheduler can
// be started again after it was stopped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use printwatch_core::config::{CleanupPolicy, KeepWarmPolicy};
use printwatch_core::human_errors::{FailureSummary, describe_failure};
use printwatch_core::types::CycleId;

use crate::fleet::Fleet;
use crate::keep_warm::KeepWarmOutcome;

/// A running periodic task.
pub struct TaskHandle {
    task: &'static str,
    cancel: CancellationToken,
    ticker: JoinHandle<()>,
    guard: Arc<Mutex<()>>,
}

impl TaskHandle {
    /// Stop ticking. No new run starts after this returns; a run in progress
    /// stops at its next device boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the ticker to exit and for a run in progress to finish.
    /// Call `cancel` first, or this waits forever.
    pub async fn wait(self) {
        if let Err(e) = self.ticker.await {
            error!(task = self.task, error = %e, "ticker task failed");
        }
        let _idle = self.guard.lock().await;
        info!(task = self.task, "stopped");
    }

    /// Stop ticking and wait for a run in progress to reach a device boundary.
    pub async fn shutdown(self) {
        self.cancel();
        self.wait().await;
    }
}

/// Drive `run` every `period` until cancelled, skipping ticks while a previous
/// run still holds `guard`.
///
/// # Panics
///
/// Panics if `period` is zero.
fn spawn_periodic<F, Fut>(
    task: &'static str,
    period: Duration,
    guard: Arc<Mutex<()>>,
    cancel: CancellationToken,
    run: F,
) -> TaskHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let ticker = {
        let guard = Arc::clone(&guard);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(task, ?period, "started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }

                match Arc::clone(&guard).try_lock_owned() {
                    Ok(permit) => {
                        let fut = run();
                        tokio::spawn(async move {
                            fut.await;
                            drop(permit);
                        });
                    }
                    Err(_) => debug!(task, "previous run still in progress; skipping tick"),
                }
            }
        })
    };

    TaskHandle {
        task,
        cancel,
        ticker,
        guard,
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Counts from one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub id: CycleId,
    pub updated: usize,
    pub failed: usize,
    pub cleanup_failures: usize,
    pub jobs_deleted: usize,
    /// Shutdown stopped the cycle before every device was visited.
    pub interrupted: bool,
}

/// Refreshes every device in the fleet, one at a time, in name order.
#[derive(Clone)]
pub struct Reconciler {
    fleet: Arc<Fleet>,
    cleanup: Arc<CleanupPolicy>,
    guard: Arc<Mutex<()>>,
}

impl Reconciler {
    pub fn new(fleet: Arc<Fleet>, cleanup: CleanupPolicy) -> Self {
        Self {
            fleet,
            cleanup: Arc::new(cleanup),
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Run one cycle now, unless one is already running.
    pub async fn try_run_cycle(&self) -> Option<CycleSummary> {
        let _permit = self.guard.try_lock().ok()?;
        Some(self.cycle(&CancellationToken::new()).await)
    }

    /// Start cycling every `period`. The first cycle starts immediately.
    pub fn start(&self, period: Duration) -> TaskHandle {
        let this = self.clone();
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        spawn_periodic(
            "reconciler",
            period,
            Arc::clone(&self.guard),
            cancel,
            move || {
                let this = this.clone();
                let stop = stop.clone();
                async move {
                    this.cycle(&stop).await;
                }
            },
        )
    }

    /// One pass over the fleet. The caller holds the guard.
    async fn cycle(&self, cancel: &CancellationToken) -> CycleSummary {
        let mut summary = CycleSummary::default();
        let span = info_span!("cycle", id = %summary.id);

        async {
            debug!(devices = self.fleet.len(), "cycle started");

            for device in self.fleet.devices() {
                if cancel.is_cancelled() {
                    summary.interrupted = true;
                    info!("shutdown requested; ending cycle early");
                    break;
                }

                match device.update().await {
                    Ok(()) => summary.updated += 1,
                    Err(e) => {
                        summary.failed += 1;
                        if e.is_device_failure() {
                            warn!(device = device.name(), error = %e, "update failed");
                        } else {
                            error!(device = device.name(), error = %e, "update failed");
                        }
                    }
                }

                match device.cleanup_broken_jobs(&self.cleanup).await {
                    Some(Ok(report)) => summary.jobs_deleted += report.deleted.len(),
                    Some(Err(e)) => {
                        summary.cleanup_failures += 1;
                        if e.is_device_failure() {
                            warn!(device = device.name(), error = %e, "job cleanup failed");
                        } else {
                            error!(device = device.name(), error = %e, "job cleanup failed");
                        }
                    }
                    None => {}
                }
            }

            info!(
                updated = summary.updated,
                failed = summary.failed,
                cleanup_failures = summary.cleanup_failures,
                jobs_deleted = summary.jobs_deleted,
                "cycle finished"
            );
        }
        .instrument(span)
        .await;

        summary
    }
}

// ---------------------------------------------------------------------------
// Keep-warm
// ---------------------------------------------------------------------------

/// What keep-warm did on one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeepWarmResult {
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<KeepWarmOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureSummary>,
}

/// Results of one keep-warm pass over the fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeepWarmPass {
    pub id: CycleId,
    pub results: Vec<KeepWarmResult>,
    pub interrupted: bool,
}

/// Runs keep-warm on every device that supports it, on its own cadence.
#[derive(Clone)]
pub struct KeepWarmRunner {
    fleet: Arc<Fleet>,
    policy: Arc<KeepWarmPolicy>,
    guard: Arc<Mutex<()>>,
}

impl KeepWarmRunner {
    pub fn new(fleet: Arc<Fleet>, policy: KeepWarmPolicy) -> Self {
        Self {
            fleet,
            policy: Arc::new(policy),
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Run one pass now, unless one is already running.
    pub async fn try_run_pass(&self) -> Option<KeepWarmPass> {
        let _permit = self.guard.try_lock().ok()?;
        Some(self.pass(&CancellationToken::new()).await)
    }

    /// Start a pass every `period`. The first pass starts immediately.
    pub fn start(&self, period: Duration) -> TaskHandle {
        let this = self.clone();
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        spawn_periodic(
            "keep-warm",
            period,
            Arc::clone(&self.guard),
            cancel,
            move || {
                let this = this.clone();
                let stop = stop.clone();
                async move {
                    this.pass(&stop).await;
                }
            },
        )
    }

    async fn pass(&self, cancel: &CancellationToken) -> KeepWarmPass {
        let mut pass = KeepWarmPass::default();
        let span = info_span!("keep_warm", id = %pass.id);

        async {
            for device in self.fleet.devices() {
                if cancel.is_cancelled() {
                    pass.interrupted = true;
                    break;
                }

                let Some(result) = device.keep_warm(&self.policy).await else {
                    continue;
                };
                let entry = match result {
                    Ok(outcome) => KeepWarmResult {
                        device: device.name().to_string(),
                        outcome: Some(outcome),
                        error: None,
                    },
                    Err(e) => {
                        warn!(device = device.name(), error = %e, "keep-warm failed");
                        KeepWarmResult {
                            device: device.name().to_string(),
                            outcome: None,
                            error: Some(describe_failure(&e)),
                        }
                    }
                };
                pass.results.push(entry);
            }
            debug!(devices = pass.results.len(), "keep-warm pass finished");
        }
        .instrument(span)
        .await;

        pass
    }
}
