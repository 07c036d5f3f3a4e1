// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-device snapshot cell.
//
// The lock only ever guards an `Arc` swap or clone. All network and parsing
// work happens before `publish` is called, so readers (the status board) never
// wait behind device I/O.

use std::sync::{Arc, Mutex, PoisonError};

use printwatch_core::types::Snapshot;

/// Holds the last published snapshot of one device.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: Mutex<Arc<Snapshot>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot wholesale.
    pub fn publish(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        // A poisoned guard still holds a whole Arc; recover it.
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = next;
    }

    /// The currently published snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }
}
