// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blueprint/clone identity and containment specs.

use super::prelude::*;

#[tokio::test]
async fn cloning_allocates_sequential_ids() {
    let stack = engine_stack();
    stack.blueprint("/std/obj", "");

    let mut ids = Vec::new();
    for _ in 0..3 {
        let clone = stack.registry.clone_object("/std/obj").await.unwrap();
        let clone = clone.lock();
        assert!(clone.is_clone());
        assert_eq!(clone.blueprint_path().unwrap().as_str(), "/std/obj");
        ids.push(clone.object_id().as_str().to_string());
    }
    assert_eq!(ids, ["/std/obj#1", "/std/obj#2", "/std/obj#3"]);
}

#[tokio::test]
async fn cloning_unknown_path_leaves_registry_unchanged() {
    let stack = engine_stack();
    assert!(stack.registry.clone_object("/not/compiled").await.is_none());
    assert_eq!(stack.registry.object_count(), 0);
    assert_eq!(stack.registry.get_stats().blueprint_count, 0);
}

#[tokio::test]
async fn containment_stays_symmetric_through_moves() {
    let stack = engine_stack();
    stack.blueprint("/areas/room", "");
    stack.blueprint("/std/coin", "");
    let room_a = stack.registry.clone_object("/areas/room").await.unwrap();
    let room_b = stack.registry.clone_object("/areas/room").await.unwrap();
    let coin = stack.registry.clone_object("/std/coin").await.unwrap();
    let coin_id = coin.lock().object_id().clone();

    assert!(stack.registry.move_object(&coin, Some(&room_a)));
    assert!(stack.registry.move_object(&coin, Some(&room_b)));

    // exactly one containment edge survives the double move
    assert!(room_a.lock().inventory().is_empty());
    assert_eq!(room_b.lock().inventory(), [coin_id]);
    let room_b_id = room_b.lock().object_id().clone();
    assert_eq!(coin.lock().environment(), Some(&room_b_id));
}

#[tokio::test]
async fn destroying_a_root_object_empties_the_registry_of_it() {
    let stack = engine_stack();
    stack.blueprint("/std/obj", "");
    let clone = stack.registry.clone_object("/std/obj").await.unwrap();
    let id = clone.lock().object_id().clone();

    stack.registry.destroy(&clone).await;
    assert!(stack.registry.find(id.as_str()).is_none());
    assert_eq!(stack.registry.get_stats().clone_count, 0);
}
