// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer. Wires configuration, the device fleet, and the background
// schedulers together for the command handlers in `main`.

pub mod config_path;
pub mod monitor_services;
