// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script host
//!
//! One configured rhai engine serves the whole driver. Mudlib source
//! compiles to a [`CompiledScript`]: an AST plus the set of function names
//! it defines, captured once so hook-presence checks stay cheap. Hooks run
//! with `this` bound to the calling object's property map; scripts never see
//! engine internals.

use em_core::ObjectPath;
use rhai::{CallFnOptions, Dynamic, Engine, FuncArgs, Map, Scope, AST};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors from running script hooks.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script function {function} not found in {path}")]
    MissingFunction { path: ObjectPath, function: String },
    #[error("{path}: {function}: {detail}")]
    Eval { path: ObjectPath, function: String, detail: String },
    #[error("{path}: {function} replaced `this` with a non-map value")]
    StateReplaced { path: ObjectPath, function: String },
}

/// A compiled mudlib source file.
///
/// Each compile produces a fresh AST sharing no state with prior loads of
/// the same path; clones capture the `Arc` current at clone time, which is
/// what gives hot reload its keep-old-behavior semantics.
#[derive(Debug)]
pub struct CompiledScript {
    path: ObjectPath,
    ast: AST,
    functions: HashSet<String>,
}

impl CompiledScript {
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// True if the script defines a top-level function with this name.
    pub fn has_fn(&self, name: &str) -> bool {
        self.functions.contains(name)
    }
}

/// Owns the rhai engine and runs compiled scripts.
///
/// The engine is configured once at construction; with the `sync` feature
/// every registered host function is `Send + Sync`, so the host can be
/// shared freely across driver subsystems.
pub struct ScriptHost {
    engine: Engine,
}

impl ScriptHost {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_max_expr_depths(128, 64);
        engine.register_fn("log", |msg: &str| {
            tracing::info!(target: "mudlib", "{msg}");
        });
        Self { engine }
    }

    /// Compile mudlib source for a content path.
    pub fn compile(
        &self,
        path: &ObjectPath,
        source: &str,
    ) -> Result<CompiledScript, crate::compiler::CompileError> {
        let ast = self.engine.compile(source).map_err(|err| crate::compiler::CompileError {
            path: path.clone(),
            detail: err.to_string(),
        })?;
        let functions = ast.iter_functions().map(|f| f.name.to_string()).collect();
        Ok(CompiledScript { path: path.clone(), ast, functions })
    }

    /// Run `function` with `this` bound to `props`.
    ///
    /// A missing function is a successful no-op. The property map is always
    /// handed back, even when the call errors, so object state survives a
    /// misbehaving hook.
    pub fn call_hook(
        &self,
        script: &CompiledScript,
        function: &str,
        props: &mut Map,
        args: impl FuncArgs,
    ) -> Result<Dynamic, ScriptError> {
        if !script.has_fn(function) {
            return Ok(Dynamic::UNIT);
        }
        let mut this = Dynamic::from_map(std::mem::take(props));
        let mut scope = Scope::new();
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut this);
        let result = self.engine.call_fn_with_options::<Dynamic>(
            options,
            &mut scope,
            &script.ast,
            function,
            args,
        );
        match this.try_cast::<Map>() {
            Some(map) => *props = map,
            None => {
                return Err(ScriptError::StateReplaced {
                    path: script.path.clone(),
                    function: function.to_string(),
                })
            }
        }
        result.map_err(|err| ScriptError::Eval {
            path: script.path.clone(),
            function: function.to_string(),
            detail: err.to_string(),
        })
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a property map to a JSON map, omitting values (function pointers,
/// opaque handles) that have no JSON representation.
pub fn props_to_json(props: &Map) -> serde_json::Map<String, serde_json::Value> {
    let mut out = serde_json::Map::new();
    for (key, value) in props {
        if let Ok(json) = rhai::serde::from_dynamic::<serde_json::Value>(value) {
            out.insert(key.to_string(), json);
        }
    }
    out
}

/// Convert a JSON map back into a property map.
pub fn json_to_props(map: &serde_json::Map<String, serde_json::Value>) -> Map {
    let mut out = Map::new();
    for (key, value) in map {
        if let Ok(dynamic) = rhai::serde::to_dynamic(value.clone()) {
            out.insert(key.as_str().into(), dynamic);
        }
    }
    out
}

/// Shared hook-name constants.
pub mod hooks {
    pub const ON_CREATE: &str = "on_create";
    pub const ON_CLONE: &str = "on_clone";
    pub const ON_DESTROY: &str = "on_destroy";
    pub const ON_RESET: &str = "on_reset";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const ON_ATTACH: &str = "on_attach";
    pub const ON_DETACH: &str = "on_detach";
    pub const ON_DRIVER_START: &str = "on_driver_start";
    pub const ON_PRELOAD: &str = "on_preload";
    pub const ON_SHUTDOWN: &str = "on_shutdown";
}

/// An `Arc<CompiledScript>` shared between a blueprint and its clones.
pub type ScriptRef = Arc<CompiledScript>;

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
