// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File store
//!
//! Layout under the data directory:
//!   players/<sanitized-name>.json
//!   world.json
//!   permissions.json
//!
//! Loads return `Ok(None)` for absent files and error only on I/O failure
//! or corrupt JSON. Writes go through a named temp file in the target
//! directory and a rename, so partial writes never land.

use crate::snapshot::{PlayerSnapshot, WorldSnapshot};
use em_core::{sanitize_player_name, PermissionsData};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PLAYERS_DIR: &str = "players";
const WORLD_FILE: &str = "world.json";
const PERMISSIONS_FILE: &str = "permissions.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt snapshot {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("player name {0:?} sanitizes to nothing")]
    UnusableName(String),
}

pub struct FileStore {
    data_path: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `data_path`, creating the layout if needed.
    pub fn open(data_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_path = data_path.into();
        fs::create_dir_all(data_path.join(PLAYERS_DIR))?;
        Ok(Self { data_path })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    // -- players -------------------------------------------------------------

    pub fn save_player(&self, snapshot: &PlayerSnapshot) -> Result<(), StoreError> {
        let file = self.player_file(&snapshot.name)?;
        self.write_atomic(&file, snapshot)
    }

    pub fn load_player(&self, name: &str) -> Result<Option<PlayerSnapshot>, StoreError> {
        let file = self.player_file(name)?;
        self.read_optional(&file)
    }

    pub fn player_exists(&self, name: &str) -> bool {
        self.player_file(name).map(|file| file.exists()).unwrap_or(false)
    }

    /// Sanitized names of every saved player, sorted.
    pub fn list_players(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.data_path.join(PLAYERS_DIR))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn delete_player(&self, name: &str) -> Result<bool, StoreError> {
        let file = self.player_file(name)?;
        if !file.exists() {
            return Ok(false);
        }
        fs::remove_file(file)?;
        Ok(true)
    }

    // -- world ---------------------------------------------------------------

    pub fn save_world_state(&self, snapshot: &WorldSnapshot) -> Result<(), StoreError> {
        self.write_atomic(&self.data_path.join(WORLD_FILE), snapshot)
    }

    pub fn load_world_state(&self) -> Result<Option<WorldSnapshot>, StoreError> {
        self.read_optional(&self.data_path.join(WORLD_FILE))
    }

    // -- permissions ---------------------------------------------------------

    pub fn save_permissions(&self, data: &PermissionsData) -> Result<(), StoreError> {
        self.write_atomic(&self.data_path.join(PERMISSIONS_FILE), data)
    }

    pub fn load_permissions(&self) -> Result<Option<PermissionsData>, StoreError> {
        self.read_optional(&self.data_path.join(PERMISSIONS_FILE))
    }

    // -- plumbing ------------------------------------------------------------

    fn player_file(&self, name: &str) -> Result<PathBuf, StoreError> {
        let sanitized = sanitize_player_name(name);
        if sanitized.is_empty() {
            return Err(StoreError::UnusableName(name.to_string()));
        }
        Ok(self.data_path.join(PLAYERS_DIR).join(format!("{sanitized}.json")))
    }

    fn write_atomic<T: Serialize>(&self, file: &Path, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(value)?;
        let dir = file.parent().unwrap_or(&self.data_path);
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(file).map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }

    fn read_optional<T: DeserializeOwned>(&self, file: &Path) -> Result<Option<T>, StoreError> {
        let raw = match fs::read_to_string(file) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value = serde_json::from_str(&raw)
            .map_err(|source| StoreError::Corrupt { path: file.to_path_buf(), source })?;
        Ok(Some(value))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
