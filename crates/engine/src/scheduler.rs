// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat fan-out and call-outs
//!
//! A clock-driven state machine: the heartbeat set (insertion-ordered) and
//! the call-out table are plain data, and `tick_heartbeats` /
//! `poll_call_outs` contain the whole protocol, so tests pump them directly
//! against a `FakeClock`. `start` spawns the two tokio interval tasks that
//! pump the same methods in production.
//!
//! Everything runs on the driver's cooperative task set: callbacks are
//! awaited one at a time and never observe each other mid-flight.

use em_core::{CallOutId, Clock, ObjectId};
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Boxed future returned by scheduler callbacks.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
/// Invoked once per heartbeat tick for each registered object.
pub type HeartbeatRunner = Arc<dyn Fn(ObjectId) -> TaskFuture + Send + Sync>;
/// A delayed or recurring callback.
pub type CallOutFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub heartbeat_interval_ms: u64,
    pub call_out_poll_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { heartbeat_interval_ms: 2000, call_out_poll_ms: 100 }
    }
}

/// Metadata of a scheduled call-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutInfo {
    pub id: CallOutId,
    pub execute_at_ms: u64,
    pub recurring: bool,
    pub interval_ms: u64,
    pub owner: Option<ObjectId>,
}

struct CallOutEntry {
    execute_at_ms: u64,
    recurring: bool,
    interval_ms: u64,
    owner: Option<ObjectId>,
    callback: CallOutFn,
}

impl CallOutEntry {
    fn info(&self, id: CallOutId) -> CallOutInfo {
        CallOutInfo {
            id,
            execute_at_ms: self.execute_at_ms,
            recurring: self.recurring,
            interval_ms: self.interval_ms,
            owner: self.owner.clone(),
        }
    }
}

#[derive(Default)]
struct SchedulerInner {
    heartbeats: IndexSet<ObjectId>,
    call_outs: BTreeMap<u64, CallOutEntry>,
    next_call_out: u64,
}

pub struct Scheduler<C: Clock> {
    this: Weak<Self>,
    clock: C,
    config: SchedulerConfig,
    inner: Mutex<SchedulerInner>,
    runner: Mutex<Option<HeartbeatRunner>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(config: SchedulerConfig, clock: C) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            clock,
            config,
            inner: Mutex::new(SchedulerInner::default()),
            runner: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Idempotent add/remove of an object's heartbeat registration.
    pub fn set_heartbeat(&self, id: &ObjectId, enabled: bool) {
        let mut inner = self.inner.lock();
        if enabled {
            inner.heartbeats.insert(id.clone());
        } else {
            inner.heartbeats.shift_remove(id);
        }
    }

    pub fn has_heartbeat(&self, id: &ObjectId) -> bool {
        self.inner.lock().heartbeats.contains(id)
    }

    pub fn heartbeat_count(&self) -> usize {
        self.inner.lock().heartbeats.len()
    }

    /// Schedule a one-shot callback after `delay_ms`.
    pub fn call_out(&self, callback: CallOutFn, delay_ms: u64) -> CallOutId {
        self.schedule(callback, delay_ms, false, None)
    }

    /// One-shot callback with an owner back-link; dropped when the owner is
    /// destroyed.
    pub fn call_out_for(&self, owner: ObjectId, callback: CallOutFn, delay_ms: u64) -> CallOutId {
        self.schedule(callback, delay_ms, false, Some(owner))
    }

    /// Schedule a recurring callback; first fire at now + interval.
    pub fn call_out_repeat(&self, callback: CallOutFn, interval_ms: u64) -> CallOutId {
        self.schedule(callback, interval_ms, true, None)
    }

    pub fn call_out_repeat_for(
        &self,
        owner: ObjectId,
        callback: CallOutFn,
        interval_ms: u64,
    ) -> CallOutId {
        self.schedule(callback, interval_ms, true, Some(owner))
    }

    fn schedule(
        &self,
        callback: CallOutFn,
        delay_ms: u64,
        recurring: bool,
        owner: Option<ObjectId>,
    ) -> CallOutId {
        let mut inner = self.inner.lock();
        inner.next_call_out += 1;
        let id = inner.next_call_out;
        inner.call_outs.insert(
            id,
            CallOutEntry {
                execute_at_ms: self.clock.epoch_ms() + delay_ms,
                recurring,
                interval_ms: delay_ms,
                owner,
                callback,
            },
        );
        CallOutId(id)
    }

    /// Cancel a pending call-out. Unknown ids return false.
    pub fn remove_call_out(&self, id: CallOutId) -> bool {
        self.inner.lock().call_outs.remove(&id.0).is_some()
    }

    pub fn get_call_out(&self, id: CallOutId) -> Option<CallOutInfo> {
        self.inner.lock().call_outs.get(&id.0).map(|entry| entry.info(id))
    }

    pub fn call_out_count(&self) -> usize {
        self.inner.lock().call_outs.len()
    }

    /// Drop the object's heartbeat registration and any call-out whose owner
    /// back-link names it. Anonymous call-outs are never scanned.
    pub fn cleanup_for_object(&self, id: &ObjectId) {
        let mut inner = self.inner.lock();
        inner.heartbeats.shift_remove(id);
        inner.call_outs.retain(|_, entry| entry.owner.as_ref() != Some(id));
    }

    /// Empty the heartbeat set and the call-out table.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.heartbeats.clear();
        inner.call_outs.clear();
    }

    pub fn set_runner(&self, runner: HeartbeatRunner) {
        *self.runner.lock() = Some(runner);
    }

    /// Spawn the heartbeat and call-out pump tasks. Idempotent.
    pub fn start(&self, runner: HeartbeatRunner) {
        self.set_runner(runner);
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        let scheduler = Arc::clone(&this);
        tasks.push(tokio::spawn(async move {
            let period = Duration::from_millis(scheduler.config.heartbeat_interval_ms.max(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // completes immediately
            loop {
                ticker.tick().await;
                scheduler.tick_heartbeats().await;
            }
        }));

        let scheduler = this;
        tasks.push(tokio::spawn(async move {
            let period = Duration::from_millis(scheduler.config.call_out_poll_ms.max(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                scheduler.poll_call_outs().await;
            }
        }));
    }

    /// Stop the pump tasks. Registered heartbeats and call-outs survive a
    /// stop/start cycle; use [`clear`](Self::clear) to empty them.
    pub fn stop(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    /// One heartbeat tick: snapshot the set, then invoke each object's
    /// heartbeat in registration order. The snapshot tolerates objects
    /// joining or leaving mid-tick.
    pub async fn tick_heartbeats(&self) {
        let runner = match self.runner.lock().clone() {
            Some(runner) => runner,
            None => return,
        };
        let snapshot: Vec<ObjectId> = self.inner.lock().heartbeats.iter().cloned().collect();
        for id in snapshot {
            runner(id).await;
        }
    }

    /// One call-out poll: run every entry due at the current clock reading,
    /// ordered by scheduled time with insertion-order tiebreak.
    pub async fn poll_call_outs(&self) {
        let now = self.clock.epoch_ms();
        let mut due: Vec<(u64, u64)> = self
            .inner
            .lock()
            .call_outs
            .iter()
            .filter(|(_, entry)| entry.execute_at_ms <= now)
            .map(|(id, entry)| (entry.execute_at_ms, *id))
            .collect();
        due.sort_unstable();

        for (_, id) in due {
            let callback = {
                let mut inner = self.inner.lock();
                let Some(entry) = inner.call_outs.get_mut(&id) else {
                    // removed by an earlier callback in this poll
                    continue;
                };
                if entry.recurring {
                    entry.execute_at_ms = now + entry.interval_ms;
                    Arc::clone(&entry.callback)
                } else {
                    // one-shot entries leave the table before the callback
                    // runs, so self-cancellation is a no-op
                    let entry = inner.call_outs.remove(&id);
                    match entry {
                        Some(entry) => entry.callback,
                        None => continue,
                    }
                }
            };
            callback().await;
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
