// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::snapshot::{ObjectRecord, PlayerSnapshot, PlayerState, WorldSnapshot};
use chrono::Utc;
use em_core::{ObjectId, ObjectPath, PermissionLevel};
use tempfile::TempDir;

fn store() -> (TempDir, FileStore) {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path().join("data")).unwrap();
    (dir, store)
}

fn player(name: &str) -> PlayerSnapshot {
    let mut properties = serde_json::Map::new();
    properties.insert("hp".into(), serde_json::json!(10));
    PlayerSnapshot {
        version: 1,
        name: name.into(),
        location: Some(ObjectPath::new("/areas/town/square")),
        state: PlayerState { properties },
        saved_at: Utc::now(),
    }
}

#[test]
fn open_creates_layout() {
    let (dir, store) = store();
    assert!(dir.path().join("data/players").is_dir());
    assert_eq!(store.list_players().unwrap(), Vec::<String>::new());
}

#[test]
fn player_save_load_round_trip() {
    let (_dir, store) = store();
    let snapshot = player("Alice");
    store.save_player(&snapshot).unwrap();

    let loaded = store.load_player("alice").unwrap().unwrap();
    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.location, Some(ObjectPath::new("/areas/town/square")));
    assert_eq!(loaded.state.properties.get("hp").unwrap(), &serde_json::json!(10));
}

#[test]
fn player_names_sanitize_to_one_file() {
    let (dir, store) = store();
    store.save_player(&player("O'Brien the 3rd")).unwrap();
    assert!(dir.path().join("data/players/obrienthe3rd.json").is_file());
    assert!(store.player_exists("obrienthe3rd"));
    assert!(store.player_exists("O'BRIEN the 3rd"));
    assert_eq!(store.list_players().unwrap(), vec!["obrienthe3rd".to_string()]);
}

#[test]
fn unusable_player_name_errors() {
    let (_dir, store) = store();
    assert!(matches!(store.save_player(&player("!!!")), Err(StoreError::UnusableName(_))));
}

#[test]
fn absent_player_is_none() {
    let (_dir, store) = store();
    assert!(store.load_player("ghost").unwrap().is_none());
    assert!(!store.player_exists("ghost"));
}

#[test]
fn delete_player() {
    let (_dir, store) = store();
    store.save_player(&player("alice")).unwrap();
    assert!(store.delete_player("alice").unwrap());
    assert!(!store.delete_player("alice").unwrap());
    assert!(store.load_player("alice").unwrap().is_none());
}

#[test]
fn world_round_trip() {
    let (_dir, store) = store();
    assert!(store.load_world_state().unwrap().is_none());

    let world = WorldSnapshot::new(vec![ObjectRecord {
        object_id: ObjectId::from_string("/std/obj#1"),
        object_path: ObjectPath::new("/std/obj"),
        environment: Some(ObjectId::from_string("/areas/room#1")),
        inventory: vec![],
        short_desc: "a thing".into(),
        long_desc: String::new(),
        properties: serde_json::Map::new(),
    }]);
    store.save_world_state(&world).unwrap();
    let loaded = store.load_world_state().unwrap().unwrap();
    assert_eq!(loaded, world);
}

#[test]
fn permissions_round_trip() {
    let (_dir, store) = store();
    assert!(store.load_permissions().unwrap().is_none());

    let mut data = em_core::PermissionsData::default();
    data.levels.insert("alice".into(), PermissionLevel::SeniorBuilder);
    data.domains.insert("bob".into(), vec!["/areas/castle/".into()]);
    store.save_permissions(&data).unwrap();
    assert_eq!(store.load_permissions().unwrap().unwrap(), data);
}

#[test]
fn corrupt_file_is_an_error_not_none() {
    let (dir, store) = store();
    std::fs::write(dir.path().join("data/world.json"), "{ not json").unwrap();
    assert!(matches!(store.load_world_state(), Err(StoreError::Corrupt { .. })));
}

#[test]
fn saves_replace_atomically() {
    let (dir, store) = store();
    let world = WorldSnapshot::new(vec![]);
    store.save_world_state(&world).unwrap();
    store.save_world_state(&world).unwrap();

    // no stray temp files survive the rename
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("data"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name != "players" && name != "world.json" && name != "permissions.json"
        })
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
}
