// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver facade
//!
//! Owns every subsystem, boots the master object, and runs the
//! stopped → starting → running → stopping state machine. Master hook
//! failures are logged and never abort boot or shutdown.

use crate::config::DriverConfig;
use crate::persist;
use em_core::{CallOutId, Clock, PermissionsData, SystemClock};
use em_engine::script::hooks;
use em_engine::{
    CommandDispatcher, Compiler, HotReload, ObjectHandle, ObjectRegistry, Permissions,
    RegistryError, Scheduler, SchedulerConfig, ScriptHost, ShadowRegistry,
};
use em_storage::{AutoSave, FileStore, StoreError, WorldSnapshot};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Driver with the production clock.
pub type SystemDriver = Driver<SystemClock>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver is {actual}, expected {expected}")]
    InvalidState { expected: DriverState, actual: DriverState },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        write!(f, "{name}")
    }
}

/// Point-in-time driver report.
#[derive(Debug, Clone)]
pub struct DriverStatus {
    pub state: DriverState,
    pub uptime_ms: u64,
    pub total_objects: usize,
    pub blueprint_count: usize,
    pub clone_count: usize,
    pub heartbeat_count: usize,
    pub watching: bool,
}

pub struct Driver<C: Clock> {
    config: DriverConfig,
    clock: C,
    state: Mutex<DriverState>,
    started_at_ms: Mutex<Option<u64>>,
    host: Arc<ScriptHost>,
    scheduler: Arc<Scheduler<C>>,
    shadows: Arc<ShadowRegistry>,
    registry: Arc<ObjectRegistry<C>>,
    permissions: Arc<Permissions<C>>,
    compiler: Arc<Compiler>,
    reload: Arc<HotReload<C>>,
    dispatcher: CommandDispatcher<C>,
    store: Arc<FileStore>,
    autosave: AutoSave,
    master: Mutex<Option<ObjectHandle>>,
    reset_call_out: Mutex<Option<CallOutId>>,
}

impl Driver<SystemClock> {
    pub fn new(config: DriverConfig) -> Result<Arc<Self>, DriverError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Driver<C> {
    pub fn with_clock(config: DriverConfig, clock: C) -> Result<Arc<Self>, DriverError> {
        let host = Arc::new(ScriptHost::new());
        let scheduler = Scheduler::new(
            SchedulerConfig {
                heartbeat_interval_ms: config.heartbeat_interval_ms,
                call_out_poll_ms: config.call_out_poll_ms,
            },
            clock.clone(),
        );
        let shadows = ShadowRegistry::new(Arc::clone(&host));
        let registry =
            ObjectRegistry::new(Arc::clone(&host), Arc::clone(&scheduler), Arc::clone(&shadows));
        let permissions = Arc::new(Permissions::new(clock.clone()));
        let compiler = Arc::new(Compiler::new(Arc::clone(&host), config.mudlib_path.clone()));
        let reload = HotReload::new(Arc::clone(&compiler), Arc::clone(&registry));
        let dispatcher = CommandDispatcher::new(Arc::clone(&registry));
        let store = Arc::new(FileStore::open(config.data_path.clone())?);

        Ok(Arc::new(Self {
            config,
            clock,
            state: Mutex::new(DriverState::Stopped),
            started_at_ms: Mutex::new(None),
            host,
            scheduler,
            shadows,
            registry,
            permissions,
            compiler,
            reload,
            dispatcher,
            store,
            autosave: AutoSave::new(),
            master: Mutex::new(None),
            reset_call_out: Mutex::new(None),
        }))
    }

    // -- accessors -----------------------------------------------------------

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        *self.state.lock()
    }

    pub fn host(&self) -> &Arc<ScriptHost> {
        &self.host
    }

    pub fn registry(&self) -> &Arc<ObjectRegistry<C>> {
        &self.registry
    }

    pub fn scheduler(&self) -> &Arc<Scheduler<C>> {
        &self.scheduler
    }

    pub fn shadows(&self) -> &Arc<ShadowRegistry> {
        &self.shadows
    }

    pub fn permissions(&self) -> &Arc<Permissions<C>> {
        &self.permissions
    }

    pub fn compiler(&self) -> &Arc<Compiler> {
        &self.compiler
    }

    pub fn reload(&self) -> &Arc<HotReload<C>> {
        &self.reload
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<C> {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    pub fn master(&self) -> Option<ObjectHandle> {
        self.master.lock().clone()
    }

    // -- lifecycle -----------------------------------------------------------

    /// Boot the world. Rejects unless the driver is stopped.
    pub async fn start(&self) -> Result<(), DriverError> {
        {
            let mut state = self.state.lock();
            if *state != DriverState::Stopped {
                return Err(DriverError::InvalidState {
                    expected: DriverState::Stopped,
                    actual: *state,
                });
            }
            *state = DriverState::Starting;
        }
        tracing::info!(mudlib = %self.config.mudlib_path.display(), "driver starting");

        match self.store.load_permissions() {
            Ok(Some(data)) => self.permissions.import(data),
            Ok(None) => {}
            Err(err) => {
                *self.state.lock() = DriverState::Stopped;
                return Err(err.into());
            }
        }

        self.boot_master().await;
        self.start_background_tasks();

        *self.state.lock() = DriverState::Running;
        *self.started_at_ms.lock() = Some(self.clock.epoch_ms());
        tracing::info!("driver running");
        Ok(())
    }

    /// Shut the world down, saving state first. Idempotent.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                DriverState::Running | DriverState::Starting => *state = DriverState::Stopping,
                _ => return,
            }
        }
        tracing::info!("driver stopping");

        if let Some(master) = self.master() {
            if let Err(err) = self.registry.run_hook(&master, hooks::ON_SHUTDOWN).await {
                tracing::warn!(%err, "master on_shutdown failed");
            }
        }

        self.save_world();
        if let Err(err) = self.store.save_permissions(&self.permissions.export()) {
            tracing::warn!(%err, "permission save failed");
        }

        self.reload.stop_watching();
        self.autosave.stop();
        if let Some(id) = self.reset_call_out.lock().take() {
            self.scheduler.remove_call_out(id);
        }
        self.scheduler.stop();
        self.shadows.clear_all().await;

        *self.state.lock() = DriverState::Stopped;
        *self.started_at_ms.lock() = None;
        tracing::info!("driver stopped");
    }

    pub fn status(&self) -> DriverStatus {
        let stats = self.registry.get_stats();
        let uptime_ms = self
            .started_at_ms
            .lock()
            .map(|started| self.clock.epoch_ms().saturating_sub(started))
            .unwrap_or(0);
        DriverStatus {
            state: self.state(),
            uptime_ms,
            total_objects: stats.total_objects,
            blueprint_count: stats.blueprint_count,
            clone_count: stats.clone_count,
            heartbeat_count: self.scheduler.heartbeat_count(),
            watching: self.reload.is_watching(),
        }
    }

    // -- persistence surface -------------------------------------------------

    pub fn save_player(&self, handle: &ObjectHandle, name: &str) -> Result<(), StoreError> {
        let snapshot = persist::player_snapshot(&self.registry, handle, name);
        self.store.save_player(&snapshot)
    }

    /// Restore a saved player onto a live object. Returns true when the
    /// snapshot's location resolved and the player was placed there.
    pub fn restore_player(
        &self,
        handle: &ObjectHandle,
        snapshot: &em_storage::PlayerSnapshot,
    ) -> bool {
        persist::restore_object_state(handle, &snapshot.state.properties);
        match &snapshot.location {
            Some(location) => persist::place_at_location(&self.registry, handle, location),
            None => false,
        }
    }

    /// Restore the world snapshot saved by the last run, if any.
    pub async fn restore_world(&self) -> Result<persist::WorldRestore, StoreError> {
        match self.store.load_world_state()? {
            Some(snapshot) => Ok(persist::restore_world(&self.registry, &snapshot).await),
            None => Ok(persist::WorldRestore::default()),
        }
    }

    fn save_world(&self) {
        let records = persist::collect_world_records(&self.registry);
        let count = records.len();
        match self.store.save_world_state(&WorldSnapshot::new(records)) {
            Ok(()) => tracing::info!(objects = count, "world saved"),
            Err(err) => tracing::warn!(%err, "world save failed"),
        }
    }

    // -- boot pieces ---------------------------------------------------------

    /// Compile the master object and run its boot hooks. A broken master is
    /// logged; the driver still comes up so an operator can fix and reload.
    /// A warm restart reuses the blueprint left from the previous run.
    async fn boot_master(&self) {
        let master_path = em_core::ObjectPath::new(&self.config.master_object);
        let existing = self.registry.blueprint_instance(&master_path);
        let handle = if let Some(existing) = existing {
            existing
        } else {
            let module = match self.compiler.load(&self.config.master_object) {
                Ok(module) => module,
                Err(err) => {
                    tracing::warn!(%err, "master object failed to compile");
                    return;
                }
            };
            match self.registry.register_blueprint(module.script, module.instance) {
                Ok(handle) => handle,
                Err(err) => {
                    tracing::warn!(%err, "master object failed to register");
                    return;
                }
            }
        };
        *self.master.lock() = Some(Arc::clone(&handle));

        if let Err(err) = self.registry.run_hook(&handle, hooks::ON_DRIVER_START).await {
            tracing::warn!(%err, "master on_driver_start failed");
        }
        self.preload(&handle).await;
    }

    /// Compile the master's preload list, isolating per-path failures.
    async fn preload(&self, master: &ObjectHandle) {
        let listed = match self.registry.run_hook(master, hooks::ON_PRELOAD).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(%err, "master on_preload failed");
                return;
            }
        };
        let Ok(paths) = listed.into_array() else {
            return;
        };

        let mut loaded = 0_usize;
        let mut failed = 0_usize;
        for entry in paths {
            let Ok(path) = entry.into_string() else { continue };
            if self.registry.has_blueprint(&em_core::ObjectPath::new(&path)) {
                continue;
            }
            match self.compiler.load(&path) {
                Ok(module) => match self.registry.register_blueprint(module.script, module.instance)
                {
                    Ok(_) => loaded += 1,
                    Err(err) => {
                        failed += 1;
                        tracing::warn!(path, %err, "preload registration failed");
                    }
                },
                Err(err) => {
                    failed += 1;
                    tracing::warn!(path, %err, "preload compile failed");
                }
            }
        }
        tracing::info!(loaded, failed, "preload complete");
    }

    fn start_background_tasks(&self) {
        let registry = Arc::clone(&self.registry);
        self.scheduler.start(Arc::new(move |id| {
            let registry = Arc::clone(&registry);
            Box::pin(async move { registry.run_heartbeat(&id).await })
        }));

        if self.config.reset_interval_ms > 0 {
            let registry = Arc::clone(&self.registry);
            let id = self.scheduler.call_out_repeat(
                Arc::new(move || {
                    let registry = Arc::clone(&registry);
                    Box::pin(async move {
                        for clone in registry.all_clones() {
                            if let Err(err) = registry.run_hook(&clone, hooks::ON_RESET).await {
                                let id = clone.lock().object_id().clone();
                                tracing::warn!(object = %id, %err, "reset hook failed");
                            }
                        }
                    })
                }),
                self.config.reset_interval_ms,
            );
            *self.reset_call_out.lock() = Some(id);
        }

        if self.config.autosave_interval_ms > 0 {
            let registry = Arc::clone(&self.registry);
            self.autosave.start(
                self.config.autosave_interval_ms,
                Arc::new(move || {
                    let registry = Arc::clone(&registry);
                    Box::pin(async move { persist::collect_world_records(&registry) })
                }),
                Arc::clone(&self.store),
            );
        }

        if self.config.hot_reload {
            if let Err(err) = self.reload.start_watching() {
                tracing::warn!(%err, "mudlib watch failed to start");
            }
        }
    }

    /// Export the permission tables; exposed for operator tooling.
    pub fn export_permissions(&self) -> PermissionsData {
        self.permissions.export()
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
