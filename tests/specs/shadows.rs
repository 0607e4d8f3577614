// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shadow interception specs.

use super::prelude::*;
use em_core::ShadowId;
use em_engine::Shadow;
use rhai::Dynamic;
use std::sync::Arc;

#[tokio::test]
async fn layered_shadows_resolve_by_priority_and_peel_off() {
    let stack = engine_stack();
    stack.blueprint("/npc/mayor", "");
    let mayor = stack.registry.clone_object("/npc/mayor").await.unwrap();
    mayor.lock().props_mut().insert("name".into(), Dynamic::from("Base".to_string()));
    let mayor_id = mayor.lock().object_id().clone();

    let low = Shadow::new("low", "disguise", 10)
        .with_override("name", Dynamic::from("Low".to_string()));
    let high = Shadow::new("high", "disguise", 100)
        .with_override("name", Dynamic::from("High".to_string()));
    stack.shadows.add_shadow(&mayor, low).await.unwrap();
    stack.shadows.add_shadow(&mayor, high).await.unwrap();

    let name = |view: &em_engine::ObjectView| {
        view.get("name").unwrap().into_string().unwrap()
    };

    let view = stack.shadows.wrap_with_proxy(&mayor);
    assert_eq!(name(&view), "High");

    assert!(stack.shadows.remove_shadow(&mayor_id, &ShadowId::new("high")).await);
    assert_eq!(name(&stack.shadows.wrap_with_proxy(&mayor)), "Low");

    assert!(stack.shadows.remove_shadow(&mayor_id, &ShadowId::new("low")).await);
    assert_eq!(name(&stack.shadows.wrap_with_proxy(&mayor)), "Base");
}

#[tokio::test]
async fn duplicate_shadow_is_rejected_cleanly() {
    let stack = engine_stack();
    stack.blueprint("/npc/mayor", "");
    let mayor = stack.registry.clone_object("/npc/mayor").await.unwrap();

    stack.shadows.add_shadow(&mayor, Shadow::new("mask", "mask", 1)).await.unwrap();
    assert!(stack
        .shadows
        .add_shadow(&mayor, Shadow::new("mask", "mask", 2))
        .await
        .is_err());
    let mayor_id = mayor.lock().object_id().clone();
    assert_eq!(stack.shadows.get_shadows(&mayor_id).len(), 1);
}

#[tokio::test]
async fn destroy_races_reject_late_attachment() {
    let stack = engine_stack();
    stack.blueprint("/npc/mayor", "");
    let mayor = stack.registry.clone_object("/npc/mayor").await.unwrap();

    stack.registry.destroy(&mayor).await;
    assert!(stack.shadows.add_shadow(&mayor, Shadow::new("late", "mask", 1)).await.is_err());
}

#[tokio::test]
async fn shadow_attachments_survive_hot_swap_of_the_blueprint() {
    let stack = engine_stack();
    stack.blueprint("/npc/mayor", "fn title() { \"old\" }");
    let mayor = stack.registry.clone_object("/npc/mayor").await.unwrap();
    let mayor_id = mayor.lock().object_id().clone();
    stack
        .shadows
        .add_shadow(
            &mayor,
            Shadow::new("crown", "regalia", 5)
                .with_override("name", Dynamic::from("The Mayor".to_string())),
        )
        .await
        .unwrap();

    let script = Arc::new(
        stack
            .host
            .compile(&em_core::ObjectPath::new("/npc/mayor"), "fn title() { \"new\" }")
            .unwrap(),
    );
    let instance = em_engine::GameObject::blueprint(
        em_core::ObjectPath::new("/npc/mayor"),
        Arc::clone(&script),
    );
    stack.registry.update_blueprint(script, instance);

    // the clone keeps its id, so the attachment still binds
    assert!(stack.shadows.has_shadows(&mayor_id));
    let view = stack.shadows.wrap_with_proxy(&mayor);
    assert_eq!(view.get("name").unwrap().into_string().unwrap(), "The Mayor");
}
