// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printwatch monitor: device capability model, snapshot store, fleet
// registry, reconciliation scheduler, job cleanup, and keep-warm.
//
// Vendor backends implement the traits in `device` and register a constructor
// in `DeviceKinds`; everything else in this crate is vendor-neutral.

pub mod cleanup;
pub mod device;
pub mod fleet;
pub mod health;
pub mod keep_warm;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod static_device;

#[cfg(test)]
pub(crate) mod testing;

pub use cleanup::CleanupReport;
pub use device::{CapabilitySet, DeviceBackend, JobCleanup, KeepWarm, MonitoredDevice};
pub use fleet::{DeviceReport, Fleet, FleetBuilder};
pub use health::DeviceHealth;
pub use keep_warm::{KeepWarmOutcome, KeepWarmState};
pub use registry::{DeviceConstructor, DeviceKinds};
pub use scheduler::{CycleSummary, KeepWarmPass, KeepWarmResult, KeepWarmRunner, Reconciler, TaskHandle};
pub use snapshot::SnapshotCell;
