// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer. Loads the configuration, builds the fleet, and owns
// the reconciliation and keep-warm schedulers.
//
// Everything here is cheaply cloneable (Arc-wrapped), so command handlers can
// hand it to background tasks without lifetime issues.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use printwatch_core::config::MonitorConfig;
use printwatch_core::error::{HealthError, Result};
use printwatch_core::types::CapabilityFlags;
use printwatch_monitor::{
    CycleSummary, DeviceKinds, DeviceReport, Fleet, KeepWarmPass, KeepWarmRunner, Reconciler,
    TaskHandle,
};

/// One line of `check-config` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceListing {
    pub name: String,
    pub capabilities: CapabilityFlags,
}

/// Result of a one-shot reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub cycle: CycleSummary,
    pub devices: Vec<DeviceReport>,
}

/// Configuration, fleet, and schedulers for one daemon process.
#[derive(Clone)]
pub struct MonitorServices {
    config: Arc<MonitorConfig>,
    fleet: Arc<Fleet>,
    reconciler: Reconciler,
    keep_warm: KeepWarmRunner,
}

impl MonitorServices {
    /// Load the configuration file and build the fleet from the built-in kinds.
    pub fn init(config_path: &Path) -> Result<Self> {
        info!(path = %config_path.display(), "loading configuration");
        let config = MonitorConfig::load(config_path)?;
        Self::from_config(config, &DeviceKinds::builtin())
    }

    /// Build services from an already validated configuration.
    pub fn from_config(config: MonitorConfig, kinds: &DeviceKinds) -> Result<Self> {
        let fleet = Arc::new(Fleet::from_config(&config, kinds)?);
        let reconciler = Reconciler::new(Arc::clone(&fleet), config.cleanup.clone());
        let keep_warm = KeepWarmRunner::new(Arc::clone(&fleet), config.keep_warm.clone());
        info!(devices = fleet.len(), "monitor services initialised");

        Ok(Self {
            config: Arc::new(config),
            fleet,
            reconciler,
            keep_warm,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn fleet(&self) -> &Arc<Fleet> {
        &self.fleet
    }

    /// Registered devices and what each can do.
    pub fn listings(&self) -> Vec<DeviceListing> {
        self.fleet
            .devices()
            .iter()
            .map(|d| DeviceListing {
                name: d.name().to_string(),
                capabilities: d.capabilities(),
            })
            .collect()
    }

    /// Start the background schedulers.
    ///
    /// Keep-warm only starts if it is enabled and at least one device supports
    /// it.
    pub fn start(&self) -> RunningServices {
        let reconciler = self.reconciler.start(self.config.update_interval());

        let wants_keep_warm = self
            .fleet
            .devices()
            .iter()
            .any(|d| d.capabilities().keep_warm);
        let keep_warm = if self.config.keep_warm_enabled && wants_keep_warm {
            Some(self.keep_warm.start(self.config.keep_warm_interval()))
        } else {
            info!(
                enabled = self.config.keep_warm_enabled,
                "keep-warm task not started"
            );
            None
        };

        RunningServices {
            reconciler,
            keep_warm,
        }
    }

    /// Run one reconciliation cycle and report on every device.
    ///
    /// Fails with `Busy` if a cycle is already in progress.
    pub async fn status_once(&self) -> Result<StatusOutput> {
        let cycle = self
            .reconciler
            .try_run_cycle()
            .await
            .ok_or_else(|| HealthError::Busy("a reconciliation cycle".into()))?;
        Ok(StatusOutput {
            cycle,
            devices: self.fleet.reports(Utc::now(), self.config.outdated_after()),
        })
    }

    /// Run one keep-warm pass regardless of `keep_warm_enabled`.
    pub async fn keep_warm_once(&self) -> Result<KeepWarmPass> {
        self.keep_warm
            .try_run_pass()
            .await
            .ok_or_else(|| HealthError::Busy("a keep-warm pass".into()))
    }
}

/// Handles for the running background schedulers.
pub struct RunningServices {
    reconciler: TaskHandle,
    keep_warm: Option<TaskHandle>,
}

impl RunningServices {
    pub fn keep_warm_running(&self) -> bool {
        self.keep_warm.is_some()
    }

    /// Stop both schedulers and wait for work in flight.
    ///
    /// Both are cancelled before either is awaited, so a long keep-warm
    /// attempt cannot keep the reconciler ticking.
    pub async fn shutdown(self) {
        self.reconciler.cancel();
        if let Some(keep_warm) = &self.keep_warm {
            keep_warm.cancel();
        }

        match self.keep_warm {
            Some(keep_warm) => {
                tokio::join!(self.reconciler.wait(), keep_warm.wait());
            }
            None => self.reconciler.wait().await,
        }
        info!("all schedulers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use printwatch_core::config::DeviceEntry;
    use printwatch_core::types::{JobRef, StatusReport};
    use printwatch_monitor::{CapabilitySet, DeviceBackend, KeepWarm};

    static WARM_FETCHES: AtomicUsize = AtomicUsize::new(0);
    static WARM_POLLS: AtomicU32 = AtomicU32::new(0);

    /// Reports fine, counting every fetch. Its keep-warm job never shows up.
    struct NeverWarm;

    #[async_trait]
    impl DeviceBackend for NeverWarm {
        async fn fetch_status(&self) -> Result<StatusReport> {
            WARM_FETCHES.fetch_add(1, Ordering::SeqCst);
            Ok(StatusReport::default())
        }
    }

    #[async_trait]
    impl KeepWarm for NeverWarm {
        async fn submit_warm_job(&self, _job_name: &str) -> Result<()> {
            Ok(())
        }
        async fn find_job(&self, _job_name: &str) -> Result<Option<JobRef>> {
            WARM_POLLS.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
        async fn delete_warm_job(&self, _job: &JobRef) -> Result<()> {
            Ok(())
        }
    }

    fn never_warm(_: &DeviceEntry) -> Result<CapabilitySet> {
        let device = Arc::new(NeverWarm);
        Ok(CapabilitySet::basic(device.clone()).with_keep_warm(device))
    }

    /// Takes five seconds to answer.
    struct Sluggish;

    #[async_trait]
    impl DeviceBackend for Sluggish {
        async fn fetch_status(&self) -> Result<StatusReport> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(StatusReport::default())
        }
    }

    fn sluggish(_: &DeviceEntry) -> Result<CapabilitySet> {
        Ok(CapabilitySet::basic(Arc::new(Sluggish)))
    }

    fn static_config(names: &[&str]) -> MonitorConfig {
        MonitorConfig {
            devices: names
                .iter()
                .map(|name| DeviceEntry::new(*name, "static"))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn status_once_updates_every_device() {
        let services =
            MonitorServices::from_config(static_config(&["b", "a"]), &DeviceKinds::builtin())
                .expect("services");

        let output = services.status_once().await.expect("not busy");

        assert_eq!(output.cycle.updated, 2);
        assert_eq!(output.cycle.failed, 0);
        let names: Vec<_> = output.devices.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(output.devices.iter().all(|r| !r.outdated));

        let json = serde_json::to_value(&output).expect("json");
        assert!(json["devices"][0]["snapshot"]["last_updated"].is_string());
    }

    #[test]
    fn listings_show_capabilities() {
        let services =
            MonitorServices::from_config(static_config(&["lobby"]), &DeviceKinds::builtin())
                .expect("services");
        let listings = services.listings();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "lobby");
        assert_eq!(listings[0].capabilities, CapabilityFlags::default());
    }

    #[test]
    fn init_reads_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{ "update_interval_secs": 60, "devices": [{{ "name": "lobby", "kind": "static" }}] }}"#
        )
        .expect("write");

        let services = MonitorServices::init(file.path()).expect("init");
        assert_eq!(services.config().update_interval(), Duration::from_secs(60));
        assert_eq!(services.fleet().len(), 1);
    }

    #[test]
    fn init_fails_on_unknown_kind() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "devices": [{{ "name": "x", "kind": "laserjet" }}] }}"#)
            .expect("write");

        let err = MonitorServices::init(file.path()).err().expect("error");
        assert!(matches!(err, HealthError::UnknownDeviceKind(_)));
    }

    #[tokio::test]
    async fn keep_warm_not_started_without_capable_devices() {
        let services =
            MonitorServices::from_config(static_config(&["lobby"]), &DeviceKinds::builtin())
                .expect("services");

        let running = services.start();
        assert!(!running.keep_warm_running());
        // Let the immediate first cycle get going.
        tokio::time::sleep(Duration::from_millis(50)).await;
        running.shutdown().await;

        assert!(services.fleet().get("lobby").unwrap().last_updated().is_some());
    }

    #[tokio::test]
    async fn manual_keep_warm_with_no_capable_devices_is_empty() {
        let services =
            MonitorServices::from_config(static_config(&["lobby"]), &DeviceKinds::builtin())
                .expect("services");
        let pass = services.keep_warm_once().await.expect("not busy");
        assert!(pass.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_reconciler_while_keep_warm_drains() {
        let mut kinds = DeviceKinds::builtin();
        kinds.register("never-warm", never_warm);
        let config = MonitorConfig {
            update_interval_secs: 10,
            devices: vec![DeviceEntry::new("cw6", "never-warm")],
            ..Default::default()
        };
        let services = MonitorServices::from_config(config, &kinds).expect("services");

        let running = services.start();
        assert!(running.keep_warm_running());
        tokio::time::sleep(Duration::from_secs(1)).await;
        let before = WARM_FETCHES.load(Ordering::SeqCst);
        assert_eq!(before, 1);

        // The keep-warm attempt in flight polls for its full budget.
        running.shutdown().await;

        assert_eq!(WARM_POLLS.load(Ordering::SeqCst), 30);
        assert_eq!(WARM_FETCHES.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn second_status_while_cycle_runs_is_busy() {
        let mut kinds = DeviceKinds::builtin();
        kinds.register("sluggish", sluggish);
        let config = MonitorConfig {
            devices: vec![DeviceEntry::new("plotter", "sluggish")],
            ..Default::default()
        };
        let services = MonitorServices::from_config(config, &kinds).expect("services");

        let first = {
            let services = services.clone();
            tokio::spawn(async move { services.status_once().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let err = services.status_once().await.err().expect("busy");
        assert!(matches!(err, HealthError::Busy(_)));
        assert_eq!(
            printwatch_core::human_errors::describe_failure(&err).kind,
            printwatch_core::human_errors::FailureKind::Transient
        );

        assert!(first.await.expect("join").is_ok());
    }
}
