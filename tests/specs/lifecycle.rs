// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver boot/shutdown and hot-reload specs.

use super::prelude::*;
use em_driver::{Driver, DriverState};
use std::sync::Arc;

#[tokio::test]
async fn hot_reload_preserves_blueprint_residents() {
    let dir = mud_dirs(&[
        (
            "master.rhai",
            "fn on_preload() { [\"/areas/town/bakery\", \"/std/bread\"] }",
        ),
        ("areas/town/bakery.rhai", "fn flavor() { \"stale\" }"),
        ("std/bread.rhai", ""),
    ]);
    let driver = Driver::new(driver_config(&dir)).unwrap();
    driver.start().await.unwrap();
    let registry = driver.registry();

    // three shared loaves live inside the blueprint instance itself
    let bakery_path = em_core::ObjectPath::new("/areas/town/bakery");
    let bakery = registry.blueprint_instance(&bakery_path).unwrap();
    let mut loaves = Vec::new();
    for _ in 0..3 {
        let loaf = registry.clone_object("/std/bread").await.unwrap();
        assert!(registry.move_object(&loaf, Some(&bakery)));
        loaves.push(loaf);
    }
    let clone = registry.clone_object("/areas/town/bakery").await.unwrap();
    let old_script = Arc::clone(clone.lock().script());

    write_mudlib(
        &dir.path().join("mudlib"),
        &[("areas/town/bakery.rhai", "fn flavor() { \"fresh\" }")],
    );
    let outcome = driver.reload().reload_object("/areas/town/bakery").await.unwrap();
    assert_eq!(outcome.existing_clones, 1);
    assert_eq!(outcome.migrated_objects, 3);

    // the same three loaves, by identity, now live in the new instance
    let new_instance = registry.blueprint_instance(&bakery_path).unwrap();
    assert!(!Arc::ptr_eq(&new_instance, &bakery));
    assert_eq!(new_instance.lock().inventory().len(), 3);
    for loaf in &loaves {
        let env = loaf.lock().environment().cloned().unwrap();
        assert_eq!(env.as_str(), "/areas/town/bakery");
    }

    // old clone keeps old behavior; new clones pick up the new source
    assert!(Arc::ptr_eq(clone.lock().script(), &old_script));
    let fresh = registry.clone_object("/areas/town/bakery").await.unwrap();
    let flavor = driver
        .shadows()
        .wrap_with_proxy(&fresh)
        .call("flavor", vec![])
        .unwrap();
    assert_eq!(flavor.into_string().unwrap(), "fresh");

    driver.stop().await;
}

#[tokio::test]
async fn status_reflects_the_live_world() {
    let dir = mud_dirs(&[
        ("master.rhai", "fn on_preload() { [\"/std/obj\"] }"),
        ("std/obj.rhai", "fn heartbeat() { }"),
    ]);
    let driver = Driver::new(driver_config(&dir)).unwrap();
    driver.start().await.unwrap();

    let clone = driver.registry().clone_object("/std/obj").await.unwrap();
    let id = clone.lock().object_id().clone();
    driver.scheduler().set_heartbeat(&id, true);

    let status = driver.status();
    assert_eq!(status.state, DriverState::Running);
    assert_eq!(status.blueprint_count, 2);
    assert_eq!(status.clone_count, 1);
    assert_eq!(status.heartbeat_count, 1);
    assert!(!status.watching);

    driver.stop().await;
    assert_eq!(driver.status().state, DriverState::Stopped);
    assert_eq!(driver.status().uptime_ms, 0);
}

#[tokio::test]
async fn commands_flow_through_a_booted_world() {
    let dir = mud_dirs(&[
        (
            "master.rhai",
            "fn on_preload() { [\"/areas/bar\", \"/std/player\"] }",
        ),
        (
            "areas/bar.rhai",
            r#"fn on_create() { this.actions = #{ "order": "do_order" }; }
               fn do_order(actor, rest) { this.last_order = rest; true }"#,
        ),
        ("std/player.rhai", ""),
    ]);
    let driver = Driver::new(driver_config(&dir)).unwrap();
    driver.start().await.unwrap();

    let registry = driver.registry();
    let bar = registry.clone_object("/areas/bar").await.unwrap();
    let player = registry.clone_object("/std/player").await.unwrap();
    registry.move_object(&player, Some(&bar));

    let result = driver.dispatcher().dispatch(&player, "order a pint").await;
    assert!(matches!(result, em_engine::DispatchResult::Handled { .. }));
    assert_eq!(
        bar.lock().props().get("last_order").unwrap().clone().into_string().unwrap(),
        "a pint"
    );

    driver.stop().await;
}
