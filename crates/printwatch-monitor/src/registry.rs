// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device kind registry.
//
// Maps the `kind` string of a configured device to the function that builds
// its backend. Vendor crates register their kinds here before the fleet is
// built; nothing is looked up by reflection.

use std::collections::BTreeMap;

use printwatch_core::config::DeviceEntry;
use printwatch_core::error::{HealthError, Result};

use crate::device::CapabilitySet;
use crate::static_device;

/// Builds a device backend from its configuration entry.
pub type DeviceConstructor = fn(&DeviceEntry) -> Result<CapabilitySet>;

/// Known device kinds.
#[derive(Debug, Clone, Default)]
pub struct DeviceKinds {
    constructors: BTreeMap<String, DeviceConstructor>,
}

impl DeviceKinds {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the kinds shipped in this crate.
    pub fn builtin() -> Self {
        let mut kinds = Self::new();
        kinds.register(static_device::KIND, static_device::construct);
        kinds
    }

    /// Register a kind, replacing any previous constructor under that name.
    pub fn register(&mut self, kind: impl Into<String>, constructor: DeviceConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build the capability set for one configured device.
    pub fn construct(&self, entry: &DeviceEntry) -> Result<CapabilitySet> {
        let constructor = self
            .constructors
            .get(&entry.kind)
            .ok_or_else(|| HealthError::UnknownDeviceKind(entry.kind.clone()))?;
        constructor(entry)
    }
}
