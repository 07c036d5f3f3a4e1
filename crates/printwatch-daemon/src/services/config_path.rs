// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration file location.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "printwatch";
const FILE_NAME: &str = "config.json";

/// Where to read the configuration from.
///
/// An explicit `--config` path wins; otherwise the XDG config directory, then
/// `~/.config`, then the working directory.
pub fn resolve(explicit: Option<&Path>) -> PathBuf {
    resolve_with(
        explicit,
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
}

fn resolve_with(
    explicit: Option<&Path>,
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    // An empty XDG_CONFIG_HOME counts as unset.
    if let Some(xdg) = xdg_config_home.filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join(APP_DIR).join(FILE_NAME);
    }
    if let Some(home) = home.filter(|v| !v.is_empty()) {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(FILE_NAME);
    }
    PathBuf::from(FILE_NAME)
}
