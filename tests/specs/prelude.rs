// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the integration specs.

#![allow(dead_code)]

use em_core::FakeClock;
use em_engine::{
    ObjectHandle, ObjectRegistry, Scheduler, SchedulerConfig, ScriptHost, ShadowRegistry,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// An engine stack over a fake clock, with no driver on top.
pub struct EngineStack {
    pub host: Arc<ScriptHost>,
    pub clock: FakeClock,
    pub scheduler: Arc<Scheduler<FakeClock>>,
    pub shadows: Arc<ShadowRegistry>,
    pub registry: Arc<ObjectRegistry<FakeClock>>,
}

pub fn engine_stack() -> EngineStack {
    let host = Arc::new(ScriptHost::new());
    let clock = FakeClock::new();
    let scheduler = Scheduler::new(SchedulerConfig::default(), clock.clone());
    let shadows = ShadowRegistry::new(Arc::clone(&host));
    let registry =
        ObjectRegistry::new(Arc::clone(&host), Arc::clone(&scheduler), Arc::clone(&shadows));
    EngineStack { host, clock, scheduler, shadows, registry }
}

impl EngineStack {
    /// Compile an inline source as a blueprint and register it.
    pub fn blueprint(&self, path: &str, source: &str) -> ObjectHandle {
        let script = Arc::new(
            self.host
                .compile(&em_core::ObjectPath::new(path), source)
                .unwrap_or_else(|err| panic!("fixture script failed to compile: {err}")),
        );
        let instance =
            em_engine::GameObject::blueprint(em_core::ObjectPath::new(path), Arc::clone(&script));
        self.registry
            .register_blueprint(script, instance)
            .unwrap_or_else(|err| panic!("fixture blueprint rejected: {err}"))
    }
}

/// Write a mudlib tree into `root`.
pub fn write_mudlib(root: &Path, files: &[(&str, &str)]) {
    for (rel, source) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap_or(root))
            .unwrap_or_else(|err| panic!("mkdir failed: {err}"));
        fs::write(&path, source).unwrap_or_else(|err| panic!("write failed: {err}"));
    }
}

/// Fresh temp dir holding a mudlib plus an empty data dir.
pub fn mud_dirs(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("tempdir failed: {err}"));
    write_mudlib(&dir.path().join("mudlib"), files);
    dir
}

pub fn driver_config(dir: &TempDir) -> em_driver::DriverConfig {
    em_driver::DriverConfig {
        mudlib_path: dir.path().join("mudlib"),
        data_path: dir.path().join("data"),
        hot_reload: false,
        autosave_interval_ms: 0,
        reset_interval_ms: 0,
        ..em_driver::DriverConfig::default()
    }
}
