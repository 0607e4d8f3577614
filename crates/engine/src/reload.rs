// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot reload
//!
//! Watches the mudlib tree and, on change to a compiled path, re-runs the
//! compiler and asks the registry to swap the blueprint. The compile step
//! runs strictly before the swap, so a broken edit never leaves the world
//! half-reloaded.

use crate::compiler::{CompileError, Compiler};
use crate::registry::ObjectRegistry;
use em_core::{Clock, ObjectPath};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("file watch error: {0}")]
    Watch(String),
}

/// Result of one successful reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadOutcome {
    pub path: ObjectPath,
    pub existing_clones: usize,
    pub migrated_objects: usize,
}

struct WatchTask {
    // Held so the OS watch stays registered; dropped on stop.
    _watcher: RecommendedWatcher,
    pump: tokio::task::JoinHandle<()>,
}

pub struct HotReload<C: Clock> {
    this: Weak<Self>,
    compiler: Arc<Compiler>,
    registry: Arc<ObjectRegistry<C>>,
    debounce: Duration,
    watch: Mutex<Option<WatchTask>>,
}

impl<C: Clock> HotReload<C> {
    pub fn new(compiler: Arc<Compiler>, registry: Arc<ObjectRegistry<C>>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            compiler,
            registry,
            debounce: Duration::from_millis(300),
            watch: Mutex::new(None),
        })
    }

    pub fn compiler(&self) -> &Arc<Compiler> {
        &self.compiler
    }

    /// Recompile a content path and swap its blueprint in place.
    ///
    /// Future clones pick up the new source immediately; existing clones
    /// keep the behavior they were created with, and anything living inside
    /// the blueprint instance's inventory is carried over untouched.
    pub async fn reload_object(&self, path: impl AsRef<str>) -> Result<ReloadOutcome, ReloadError> {
        let module = self.compiler.load(path)?;
        let path = module.instance.object_path().clone();
        let swap = self.registry.update_blueprint(module.script, module.instance);
        Ok(ReloadOutcome {
            path,
            existing_clones: swap.existing_clones,
            migrated_objects: swap.migrated_objects,
        })
    }

    /// Start watching the mudlib tree. Idempotent.
    pub fn start_watching(&self) -> Result<(), ReloadError> {
        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };
        let mut watch = self.watch.lock();
        if watch.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher =
            notify::recommended_watcher(move |event: Result<notify::Event, notify::Error>| {
                let Ok(event) = event else { return };
                if event.kind.is_modify() || event.kind.is_create() {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
            })
            .map_err(|err| ReloadError::Watch(err.to_string()))?;
        watcher
            .watch(self.compiler.mudlib_root(), RecursiveMode::Recursive)
            .map_err(|err| ReloadError::Watch(err.to_string()))?;

        let pump = tokio::spawn(async move { this.pump_events(rx).await });
        *watch = Some(WatchTask { _watcher: watcher, pump });
        tracing::info!(root = %self.compiler.mudlib_root().display(), "watching mudlib for changes");
        Ok(())
    }

    pub fn stop_watching(&self) {
        if let Some(task) = self.watch.lock().take() {
            task.pump.abort();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watch.lock().is_some()
    }

    async fn pump_events(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<PathBuf>) {
        // Editors fire several fs events per save; collapse bursts per path.
        let mut last_handled: HashMap<ObjectPath, Instant> = HashMap::new();
        while let Some(file) = rx.recv().await {
            let Some(path) = self.compiler.content_path_for(&file) else {
                continue;
            };
            let now = Instant::now();
            if last_handled
                .get(&path)
                .is_some_and(|at| now.duration_since(*at) < self.debounce)
            {
                continue;
            }
            last_handled.insert(path.clone(), now);

            // only already-compiled paths reload automatically
            if !self.registry.has_blueprint(&path) {
                continue;
            }
            match self.reload_object(path.as_str()).await {
                Ok(outcome) => tracing::info!(
                    path = %outcome.path,
                    existing_clones = outcome.existing_clones,
                    migrated = outcome.migrated_objects,
                    "hot reload complete"
                ),
                Err(err) => tracing::warn!(%path, %err, "hot reload failed"),
            }
        }
    }
}

#[cfg(test)]
#[path = "reload_tests.rs"]
mod tests;
