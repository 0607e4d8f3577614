// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Player save/load round-trip specs through a full driver.

use super::prelude::*;
use em_driver::Driver;
use rhai::Dynamic;

const PLAYER: &str = r#"
fn on_create() {
    this.short_desc = "a traveler";
    this.hp = 100;
    this.flags = #{ "seen_intro": true };
}
"#;

#[tokio::test]
async fn saved_player_properties_survive_the_round_trip() {
    let dir = mud_dirs(&[
        ("master.rhai", "fn on_preload() { [\"/std/player\", \"/areas/inn\"] }"),
        ("std/player.rhai", PLAYER),
        ("areas/inn.rhai", r#"fn on_create() { this.short_desc = "the inn"; }"#),
    ]);
    let driver = Driver::new(driver_config(&dir)).unwrap();
    driver.start().await.unwrap();

    let registry = driver.registry();
    let inn = registry.clone_object("/areas/inn").await.unwrap();
    let player = registry.clone_object("/std/player").await.unwrap();
    registry.move_object(&player, Some(&inn));
    player.lock().props_mut().insert("hp".into(), Dynamic::from(73_i64));

    driver.save_player(&player, "Wanderer").unwrap();
    assert!(driver.store().player_exists("wanderer"));
    assert_eq!(driver.store().list_players().unwrap(), vec!["wanderer".to_string()]);

    let snapshot = driver.store().load_player("wanderer").unwrap().unwrap();
    assert_eq!(snapshot.location, Some(em_core::ObjectPath::new("/areas/inn")));
    assert_eq!(snapshot.state.properties.get("hp").unwrap(), &serde_json::json!(73));
    assert_eq!(
        snapshot.state.properties.get("flags").unwrap(),
        &serde_json::json!({ "seen_intro": true })
    );

    // rehydrate onto a fresh incarnation
    let fresh = registry.clone_object("/std/player").await.unwrap();
    assert!(driver.restore_player(&fresh, &snapshot));
    assert_eq!(fresh.lock().props().get("hp").unwrap().as_int().unwrap(), 73);

    assert!(driver.store().delete_player("wanderer").unwrap());
    assert!(driver.store().load_player("wanderer").unwrap().is_none());
    driver.stop().await;
}

#[tokio::test]
async fn missing_location_leaves_player_in_the_void() {
    let dir = mud_dirs(&[
        ("master.rhai", "fn on_preload() { [\"/std/player\"] }"),
        ("std/player.rhai", PLAYER),
    ]);
    let driver = Driver::new(driver_config(&dir)).unwrap();
    driver.start().await.unwrap();

    let registry = driver.registry();
    let player = registry.clone_object("/std/player").await.unwrap();
    driver.save_player(&player, "lost").unwrap();

    let mut snapshot = driver.store().load_player("lost").unwrap().unwrap();
    snapshot.location = Some(em_core::ObjectPath::new("/areas/demolished"));

    let fresh = registry.clone_object("/std/player").await.unwrap();
    assert!(!driver.restore_player(&fresh, &snapshot));
    assert!(fresh.lock().environment().is_none());
    driver.stop().await;
}
