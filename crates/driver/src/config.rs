// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver configuration
//!
//! Loaded from an `embermud.toml` file; every field has a default so a
//! bare mudlib directory is enough to boot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Root of the mudlib source tree.
    pub mudlib_path: PathBuf,
    /// Root of the persisted state layout.
    pub data_path: PathBuf,
    /// Content path of the master object.
    pub master_object: String,
    /// Port the surrounding transport layer should bind.
    pub port: u16,
    pub heartbeat_interval_ms: u64,
    pub call_out_poll_ms: u64,
    /// Interval of the `on_reset` sweep over live clones; 0 disables.
    pub reset_interval_ms: u64,
    /// World auto-save interval; 0 disables.
    pub autosave_interval_ms: u64,
    pub log_level: String,
    pub hot_reload: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            mudlib_path: PathBuf::from("mudlib"),
            data_path: PathBuf::from("data"),
            master_object: "/master".to_string(),
            port: 4000,
            heartbeat_interval_ms: 2000,
            call_out_poll_ms: 100,
            reset_interval_ms: 900_000,
            autosave_interval_ms: 300_000,
            log_level: "info".to_string(),
            hot_reload: true,
        }
    }
}

impl DriverConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
