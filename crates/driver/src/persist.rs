// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot and restore glue
//!
//! Turns live game objects into storage records and back. Cross-references
//! travel as id strings; restore runs in two passes so every object exists
//! before placement begins. Records whose blueprint is unknown are skipped
//! with a warning; the mudlib decides what, if anything, to do about them.

use chrono::Utc;
use em_core::{Clock, ObjectId, ObjectPath};
use em_engine::{ObjectHandle, ObjectRegistry};
use em_storage::{
    ObjectRecord, PlayerSnapshot, PlayerState, WorldSnapshot, CURRENT_SNAPSHOT_VERSION,
};
use std::collections::HashMap;

/// Outcome of a world restore pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldRestore {
    pub restored: usize,
    pub skipped: usize,
}

/// Serialize one live object.
pub fn object_record(handle: &ObjectHandle) -> ObjectRecord {
    let object = handle.lock();
    ObjectRecord {
        object_id: object.object_id().clone(),
        object_path: object.object_path().clone(),
        environment: object.environment().cloned(),
        inventory: object.inventory().to_vec(),
        short_desc: object.short_desc().to_string(),
        long_desc: object.long_desc().to_string(),
        properties: object.properties_json(),
    }
}

/// Serialize every live clone, in id order.
pub fn collect_world_records<C: Clock>(registry: &ObjectRegistry<C>) -> Vec<ObjectRecord> {
    registry.all_clones().iter().map(object_record).collect()
}

/// Build a player snapshot from a live object.
///
/// The location is the content path of the player's environment, so a
/// restore can land in a freshly cloned room rather than a stale id.
pub fn player_snapshot<C: Clock>(
    registry: &ObjectRegistry<C>,
    handle: &ObjectHandle,
    name: &str,
) -> PlayerSnapshot {
    let (env_id, properties) = {
        let object = handle.lock();
        (object.environment().cloned(), object.properties_json())
    };
    let location = env_id
        .and_then(|id| registry.find(id.as_str()))
        .map(|env| env.lock().object_path().clone());
    PlayerSnapshot {
        version: CURRENT_SNAPSHOT_VERSION,
        name: name.to_string(),
        location,
        state: PlayerState { properties },
        saved_at: Utc::now(),
    }
}

/// Copy snapshot properties onto an object, leaving identity untouched.
pub fn restore_object_state(
    handle: &ObjectHandle,
    properties: &serde_json::Map<String, serde_json::Value>,
) {
    handle.lock().apply_properties(properties);
}

/// Rebuild world state from a snapshot.
///
/// Pass one re-clones every record whose blueprint is registered and
/// restores its state; pass two places objects by mapping the snapshot's
/// ids onto the fresh clones (falling back to blueprint instances for
/// residents of a blueprint's own inventory). Unknown blueprints and
/// unresolvable environments are skipped with a warning.
pub async fn restore_world<C: Clock>(
    registry: &ObjectRegistry<C>,
    snapshot: &WorldSnapshot,
) -> WorldRestore {
    let mut outcome = WorldRestore::default();
    let mut remapped: HashMap<ObjectId, ObjectHandle> = HashMap::new();

    for record in &snapshot.objects {
        if !registry.has_blueprint(&record.object_path) {
            tracing::warn!(
                object = %record.object_id,
                path = %record.object_path,
                "skipping restore: blueprint not registered"
            );
            outcome.skipped += 1;
            continue;
        }
        let Some(handle) = registry.clone_object(record.object_path.as_str()).await else {
            outcome.skipped += 1;
            continue;
        };
        restore_object_state(&handle, &record.properties);
        {
            let mut object = handle.lock();
            if !record.short_desc.is_empty() {
                object.set_short_desc(record.short_desc.clone());
            }
            if !record.long_desc.is_empty() {
                object.set_long_desc(record.long_desc.clone());
            }
        }
        remapped.insert(record.object_id.clone(), handle);
        outcome.restored += 1;
    }

    for record in &snapshot.objects {
        let Some(handle) = remapped.get(&record.object_id) else { continue };
        let Some(env_id) = &record.environment else { continue };

        let destination = remapped
            .get(env_id)
            .cloned()
            .or_else(|| registry.blueprint_instance(&env_id.path()).filter(|_| !env_id.is_clone_id()));
        match destination {
            Some(dest) => {
                registry.move_object(handle, Some(&dest));
            }
            None => tracing::warn!(
                object = %record.object_id,
                environment = %env_id,
                "restored into the void: environment not found"
            ),
        }
    }
    outcome
}

/// Place a restored player at a snapshot location.
///
/// Returns false (leaving the player in the void) when the location does
/// not resolve to a live object.
pub fn place_at_location<C: Clock>(
    registry: &ObjectRegistry<C>,
    handle: &ObjectHandle,
    location: &ObjectPath,
) -> bool {
    match registry.find(location.as_str()) {
        Some(room) => registry.move_object(handle, Some(&room)),
        None => {
            tracing::warn!(%location, "player location not loaded; leaving in the void");
            false
        }
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
