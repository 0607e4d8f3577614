// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-save
//!
//! A recurring saver that collects the current world records from a source
//! closure and writes the world snapshot. Save failures are logged and the
//! schedule continues; starting again silently replaces the prior schedule.

use crate::snapshot::{ObjectRecord, WorldSnapshot};
use crate::store::FileStore;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Produces the records to persist on each auto-save pass.
pub type SnapshotSource =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Vec<ObjectRecord>> + Send>> + Send + Sync>;

#[derive(Default)]
pub struct AutoSave {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoSave {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin saving every `interval_ms`. Replaces any running schedule.
    pub fn start(&self, interval_ms: u64, source: SnapshotSource, store: Arc<FileStore>) {
        let mut slot = self.task.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let handle = tokio::spawn(async move {
            let period = Duration::from_millis(interval_ms.max(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // completes immediately
            loop {
                ticker.tick().await;
                let objects = source().await;
                let count = objects.len();
                match store.save_world_state(&WorldSnapshot::new(objects)) {
                    Ok(()) => tracing::debug!(objects = count, "auto-save complete"),
                    Err(err) => tracing::warn!(%err, "auto-save failed"),
                }
            }
        });
        *slot = Some(handle);
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "autosave_tests.rs"]
mod tests;
