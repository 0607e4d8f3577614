// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot document types
//!
//! Versioned JSON documents; future format migrations key off the version
//! field at load time. Cross-references between objects are id strings,
//! rehydrated by the caller once every record is loaded.

use chrono::{DateTime, Utc};
use em_core::{ObjectId, ObjectPath};
use serde::{Deserialize, Serialize};

/// Current schema version for all snapshot kinds.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 {
    CURRENT_SNAPSHOT_VERSION
}

/// One serialized game object inside a world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub object_id: ObjectId,
    pub object_path: ObjectPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inventory: Vec<ObjectId>,
    #[serde(default)]
    pub short_desc: String,
    #[serde(default)]
    pub long_desc: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Persisted player state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(rename = "v", default = "current_version")]
    pub version: u32,
    pub name: String,
    /// Content path of the player's environment at save time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ObjectPath>,
    pub state: PlayerState,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Persisted world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(rename = "v", default = "current_version")]
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub objects: Vec<ObjectRecord>,
}

impl WorldSnapshot {
    pub fn new(objects: Vec<ObjectRecord>) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, saved_at: Utc::now(), objects }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
