// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted device doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use printwatch_core::error::{HealthError, Result};
use printwatch_core::types::{FailedJobs, JobRef, StatusReport};

use crate::device::{CapabilitySet, DeviceBackend, JobCleanup, KeepWarm};

/// How a scripted backend answers `fetch_status`.
#[derive(Clone)]
pub enum Answer {
    Report(StatusReport),
    Unreachable,
    Garbled,
}

/// A backend that answers from a fixed script and counts its callers.
pub struct ScriptedBackend {
    answer: Mutex<Answer>,
    delay: Mutex<Duration>,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(answer: Answer) -> Self {
        Self {
            answer: Mutex::new(answer),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn healthy(job_count: u32) -> Self {
        Self::new(Answer::Report(StatusReport {
            job_count,
            ready_for_submission: true,
            ..Default::default()
        }))
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("delay lock") = delay;
    }

    pub fn set_answer(&self, answer: Answer) {
        *self.answer.lock().expect("answer lock") = answer;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceBackend for ScriptedBackend {
    async fn fetch_status(&self) -> Result<StatusReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let delay = *self.delay.lock().expect("delay lock");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let answer = self.answer.lock().expect("answer lock").clone();
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        match answer {
            Answer::Report(report) => Ok(report),
            Answer::Unreachable => Err(HealthError::DeviceUnreachable("connection refused".into())),
            Answer::Garbled => Err(HealthError::DeviceProtocol("unknown toner level Foo".into())),
        }
    }

    fn web_interface_uri(&self) -> Option<String> {
        Some("http://printer.test/".into())
    }
}

/// A job-cleanup target that replays a sequence of failed-job listings.
///
/// Once the script runs out every further query reports a clean queue.
#[derive(Default)]
pub struct ScriptedCleanup {
    listings: Mutex<VecDeque<FailedJobs>>,
    pub sessions: AtomicUsize,
    pub queries: AtomicUsize,
    pub deleted: Mutex<Vec<(JobRef, Instant)>>,
    pub query_times: Mutex<Vec<Instant>>,
    repeat_forever: Option<FailedJobs>,
}

impl ScriptedCleanup {
    pub fn new(listings: Vec<FailedJobs>) -> Self {
        Self {
            listings: Mutex::new(listings.into()),
            ..Default::default()
        }
    }

    /// Jobs as failed-job listings without a status code.
    pub fn from_jobs(rounds: &[&[&str]]) -> Self {
        Self::new(
            rounds
                .iter()
                .map(|round| FailedJobs {
                    status_code: None,
                    jobs: round.iter().map(|id| JobRef::new(*id)).collect(),
                })
                .collect(),
        )
    }

    /// Reports the same failed jobs on every query.
    pub fn never_clean(jobs: FailedJobs) -> Self {
        Self {
            repeat_forever: Some(jobs),
            ..Default::default()
        }
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted
            .lock()
            .expect("deleted lock")
            .iter()
            .map(|(job, _)| job.0.clone())
            .collect()
    }
}

#[async_trait]
impl JobCleanup for ScriptedCleanup {
    async fn open_session(&self) -> Result<()> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn failed_jobs(&self) -> Result<FailedJobs> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.query_times.lock().expect("times lock").push(Instant::now());
        if let Some(jobs) = &self.repeat_forever {
            return Ok(jobs.clone());
        }
        Ok(self
            .listings
            .lock()
            .expect("listings lock")
            .pop_front()
            .unwrap_or_default())
    }

    async fn delete_failed_job(&self, job: &JobRef) -> Result<()> {
        self.deleted
            .lock()
            .expect("deleted lock")
            .push((job.clone(), Instant::now()));
        Ok(())
    }
}

/// A keep-warm target whose job shows up on a chosen poll (or never).
pub struct ScriptedKeepWarm {
    appears_on_poll: Option<u32>,
    job: JobRef,
    pub submitted: Mutex<Vec<String>>,
    pub polls: AtomicU32,
    pub poll_times: Mutex<Vec<Instant>>,
    pub deleted: Mutex<Vec<(JobRef, Instant)>>,
}

impl ScriptedKeepWarm {
    pub fn new(appears_on_poll: Option<u32>) -> Self {
        Self {
            appears_on_poll,
            job: JobRef::new("4711"),
            submitted: Mutex::new(Vec::new()),
            polls: AtomicU32::new(0),
            poll_times: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn deletions(&self) -> usize {
        self.deleted.lock().expect("deleted lock").len()
    }
}

#[async_trait]
impl KeepWarm for ScriptedKeepWarm {
    async fn submit_warm_job(&self, job_name: &str) -> Result<()> {
        self.submitted
            .lock()
            .expect("submitted lock")
            .push(job_name.to_string());
        Ok(())
    }

    async fn find_job(&self, job_name: &str) -> Result<Option<JobRef>> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        self.poll_times.lock().expect("times lock").push(Instant::now());

        let submitted = self
            .submitted
            .lock()
            .expect("submitted lock")
            .iter()
            .any(|name| name == job_name);
        match self.appears_on_poll {
            Some(n) if submitted && poll >= n => Ok(Some(self.job.clone())),
            _ => Ok(None),
        }
    }

    async fn delete_warm_job(&self, job: &JobRef) -> Result<()> {
        self.deleted
            .lock()
            .expect("deleted lock")
            .push((job.clone(), Instant::now()));
        Ok(())
    }
}

/// Capability set for a backend that also supports cleanup and keep-warm.
pub fn full_capabilities(
    backend: Arc<ScriptedBackend>,
    cleanup: Arc<ScriptedCleanup>,
    keep_warm: Arc<ScriptedKeepWarm>,
) -> CapabilitySet {
    CapabilitySet::basic(backend)
        .with_job_cleanup(cleanup)
        .with_keep_warm(keep_warm)
}
