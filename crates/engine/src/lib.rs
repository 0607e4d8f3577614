// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! em-engine: The embermud driver core
//!
//! Loads mudlib scripts into callable blueprints, clones them into live game
//! objects, schedules their heartbeats and call-outs, layers shadows over
//! their reads, hot-reloads their source while the world is live, and gates
//! file access by permission level.

pub mod command;
pub mod compiler;
pub mod object;
pub mod perms;
pub mod registry;
pub mod reload;
pub mod scheduler;
pub mod script;
pub mod shadow;

pub use command::{CommandDispatcher, DispatchResult};
pub use compiler::{CompileError, CompiledModule, Compiler};
pub use object::{GameObject, ObjectHandle};
pub use perms::Permissions;
pub use registry::{Blueprint, BlueprintSwap, ObjectRegistry, RegistryError, RegistryStats};
pub use reload::{HotReload, ReloadError, ReloadOutcome};
pub use scheduler::{
    CallOutFn, CallOutInfo, HeartbeatRunner, Scheduler, SchedulerConfig, TaskFuture,
};
pub use script::{CompiledScript, ScriptError, ScriptHost};
pub use shadow::{ObjectView, Shadow, ShadowError, ShadowHandle, ShadowRegistry, ShadowStats};
