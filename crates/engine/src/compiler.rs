// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mudlib compiler
//!
//! Resolves a content path to a source file under the mudlib root, compiles
//! it, and builds the blueprint instance. Recompiling a path always yields a
//! fresh script sharing no state with prior loads; the hot-reload semantics
//! stand on that property.

use crate::object::GameObject;
use crate::script::{hooks, ScriptHost, ScriptRef};
use em_core::ObjectPath;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Source file extension for mudlib content.
pub const SOURCE_EXTENSION: &str = "rhai";

/// Compilation failure; the existing blueprint (if any) is left untouched.
#[derive(Debug, Error)]
#[error("compile error in {path}: {detail}")]
pub struct CompileError {
    pub path: ObjectPath,
    pub detail: String,
}

/// A compiled source file plus its configured blueprint instance.
#[derive(Debug)]
pub struct CompiledModule {
    pub script: ScriptRef,
    pub instance: GameObject,
}

pub struct Compiler {
    host: Arc<ScriptHost>,
    mudlib_root: PathBuf,
}

impl Compiler {
    pub fn new(host: Arc<ScriptHost>, mudlib_root: impl Into<PathBuf>) -> Self {
        Self { host, mudlib_root: mudlib_root.into() }
    }

    pub fn mudlib_root(&self) -> &Path {
        &self.mudlib_root
    }

    /// Filesystem location of a content path's source.
    pub fn source_path(&self, path: &ObjectPath) -> PathBuf {
        let relative = path.as_str().trim_start_matches('/');
        self.mudlib_root.join(relative).with_extension(SOURCE_EXTENSION)
    }

    /// Map a filesystem path back to its content path, if it is a mudlib
    /// source file under the root.
    pub fn content_path_for(&self, file: &Path) -> Option<ObjectPath> {
        if file.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
            return None;
        }
        let relative = file.strip_prefix(&self.mudlib_root).ok()?;
        let stem = relative.with_extension("");
        let content = stem.to_str()?.replace(std::path::MAIN_SEPARATOR, "/");
        Some(ObjectPath::new(format!("/{content}")))
    }

    /// Load a content path: read, compile, and construct the blueprint
    /// instance. The instance's creation hook runs here, before the caller
    /// registers anything, so a failing compile can never touch the world.
    pub fn load(&self, path: impl AsRef<str>) -> Result<CompiledModule, CompileError> {
        let path = ObjectPath::new(path.as_ref());
        let file = self.source_path(&path);
        let source = std::fs::read_to_string(&file).map_err(|err| CompileError {
            path: path.clone(),
            detail: format!("{}: {err}", file.display()),
        })?;
        let script: ScriptRef = Arc::new(self.host.compile(&path, &source)?);

        let mut instance = GameObject::blueprint(path.clone(), Arc::clone(&script));
        let mut props = instance.take_props();
        let created = self.host.call_hook(&script, hooks::ON_CREATE, &mut props, ());
        instance.restore_props(props);
        instance.sync_from_props();
        if let Err(err) = created {
            tracing::warn!(%path, %err, "blueprint creation hook failed");
        }
        Ok(CompiledModule { script, instance })
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
