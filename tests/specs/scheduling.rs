// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat and call-out specs, pumped against the fake clock.

use super::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn heartbeats_tick_objects_until_unregistered() {
    let stack = engine_stack();
    stack.blueprint(
        "/npc/clockwork",
        "fn on_create() { this.beats = 0; }\nfn heartbeat() { this.beats += 1; }",
    );
    let toy = stack.registry.clone_object("/npc/clockwork").await.unwrap();
    let toy_id = toy.lock().object_id().clone();

    let registry = Arc::clone(&stack.registry);
    stack.scheduler.set_runner(Arc::new(move |id| {
        let registry = Arc::clone(&registry);
        Box::pin(async move { registry.run_heartbeat(&id).await })
    }));
    stack.scheduler.set_heartbeat(&toy_id, true);
    assert!(stack.scheduler.has_heartbeat(&toy_id));

    for _ in 0..3 {
        stack.scheduler.tick_heartbeats().await;
    }
    assert!(toy.lock().props().get("beats").unwrap().as_int().unwrap() >= 3);

    stack.scheduler.set_heartbeat(&toy_id, false);
    stack.scheduler.tick_heartbeats().await;
    assert_eq!(toy.lock().props().get("beats").unwrap().as_int().unwrap(), 3);
}

#[tokio::test]
async fn one_shot_and_recurring_call_outs_coexist() {
    let stack = engine_stack();
    let hits: Arc<counters::Counter> = Arc::new(counters::Counter::default());

    let one_shot_hits = Arc::clone(&hits);
    stack.scheduler.call_out(
        Arc::new(move || {
            let hits = Arc::clone(&one_shot_hits);
            Box::pin(async move { hits.bump_one_shot() })
        }),
        50,
    );
    let recurring_hits = Arc::clone(&hits);
    let recurring = stack.scheduler.call_out_repeat(
        Arc::new(move || {
            let hits = Arc::clone(&recurring_hits);
            Box::pin(async move { hits.bump_recurring() })
        }),
        50,
    );

    for _ in 0..7 {
        stack.clock.advance(Duration::from_millis(50));
        stack.scheduler.poll_call_outs().await;
    }
    assert_eq!(hits.one_shot(), 1, "one-shot fired exactly once");
    assert!(hits.recurring() >= 5, "recurring fired repeatedly");

    assert!(stack.scheduler.remove_call_out(recurring));
    let frozen = hits.recurring();
    stack.clock.advance(Duration::from_millis(500));
    stack.scheduler.poll_call_outs().await;
    assert_eq!(hits.recurring(), frozen, "cancelled call-out stays silent");
}

mod counters {
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct Counter {
        one_shot: AtomicUsize,
        recurring: AtomicUsize,
    }

    impl Counter {
        pub fn bump_one_shot(&self) {
            self.one_shot.fetch_add(1, Ordering::SeqCst);
        }

        pub fn bump_recurring(&self) {
            self.recurring.fetch_add(1, Ordering::SeqCst);
        }

        pub fn one_shot(&self) -> usize {
            self.one_shot.load(Ordering::SeqCst)
        }

        pub fn recurring(&self) -> usize {
            self.recurring.load(Ordering::SeqCst)
        }
    }
}

#[tokio::test]
async fn destroyed_objects_fall_out_of_the_heartbeat_set() {
    let stack = engine_stack();
    stack.blueprint("/npc/clockwork", "fn heartbeat() { }");
    let toy = stack.registry.clone_object("/npc/clockwork").await.unwrap();
    let toy_id = toy.lock().object_id().clone();
    stack.scheduler.set_heartbeat(&toy_id, true);

    stack.registry.destroy(&toy).await;
    assert!(!stack.scheduler.has_heartbeat(&toy_id));
    assert_eq!(stack.scheduler.heartbeat_count(), 0);
}
