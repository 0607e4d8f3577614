// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shadow registry
//!
//! Shadows overlay an object without the object knowing: reads through an
//! [`ObjectView`] resolve against the target's shadow list in priority order
//! before falling back to the target itself. Identity and containment keys
//! are unshadowable, writes always pass through to the target, and method
//! dispatch walks the same chain with shadow functions bound to the
//! shadow's own state.

use crate::object::{run_hook_on_object, ObjectHandle};
use crate::script::{hooks, ScriptError, ScriptHost, ScriptRef};
use em_core::{ObjectId, ShadowId};
use parking_lot::Mutex;
use rhai::{Dynamic, Map};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Keys that bypass every shadow: forging identity or corrupting the
/// containment tree through an overlay is never allowed.
pub const UNSHADOWABLE_KEYS: [&str; 6] =
    ["object_id", "object_path", "is_clone", "blueprint", "environment", "inventory"];

#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("shadow {shadow_id} already attached to {target}")]
    Duplicate { target: ObjectId, shadow_id: ShadowId },
    #[error("cannot shadow {0}: target is being destroyed")]
    TargetDestroyed(ObjectId),
}

/// An overlay attached to one target object.
#[derive(Debug)]
pub struct Shadow {
    shadow_id: ShadowId,
    shadow_type: String,
    priority: i64,
    active: bool,
    target: Option<ObjectId>,
    overrides: Map,
    script: Option<ScriptRef>,
    state: Map,
}

impl Shadow {
    pub fn new(shadow_id: impl Into<ShadowId>, shadow_type: impl Into<String>, priority: i64) -> Self {
        Self {
            shadow_id: shadow_id.into(),
            shadow_type: shadow_type.into(),
            priority,
            active: true,
            target: None,
            overrides: Map::new(),
            script: None,
            state: Map::new(),
        }
    }

    /// Add a property override; highest-priority active override wins reads.
    pub fn with_override(mut self, key: &str, value: Dynamic) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }

    /// Back the shadow with a compiled script providing method overrides and
    /// the attach/detach hooks.
    pub fn with_script(mut self, script: ScriptRef) -> Self {
        self.script = Some(script);
        self
    }

    pub fn shadow_id(&self) -> &ShadowId {
        &self.shadow_id
    }

    pub fn shadow_type(&self) -> &str {
        &self.shadow_type
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Target id; managed by the registry.
    pub fn target(&self) -> Option<&ObjectId> {
        self.target.as_ref()
    }

    pub fn has_override(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    pub fn override_value(&self, key: &str) -> Option<Dynamic> {
        self.overrides.get(key).cloned()
    }

    pub fn set_override(&mut self, key: &str, value: Dynamic) {
        self.overrides.insert(key.into(), value);
    }

    pub fn script(&self) -> Option<&ScriptRef> {
        self.script.as_ref()
    }

    fn take_state(&mut self) -> Map {
        std::mem::take(&mut self.state)
    }

    fn restore_state(&mut self, state: Map) {
        self.state = state;
    }
}

pub type ShadowHandle = Arc<Mutex<Shadow>>;

/// Per-`shadow_type` attachment counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowStats {
    pub shadowed_objects: usize,
    pub total_shadows: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Default)]
struct ShadowInner {
    /// Shadow lists per target, priority-descending, insertion-stable.
    attachments: HashMap<ObjectId, Vec<ShadowHandle>>,
    /// Cached views, invalidated on any change to the target's list.
    views: HashMap<ObjectId, ObjectView>,
}

pub struct ShadowRegistry {
    this: Weak<Self>,
    host: Arc<ScriptHost>,
    inner: Mutex<ShadowInner>,
}

impl ShadowRegistry {
    pub fn new(host: Arc<ScriptHost>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            host,
            inner: Mutex::new(ShadowInner::default()),
        })
    }

    pub(crate) fn host(&self) -> &Arc<ScriptHost> {
        &self.host
    }

    /// Attach a shadow to a target.
    ///
    /// Duplicate `shadow_id`s on the same target are rejected without firing
    /// `on_attach`. Attach-hook failures are logged and the shadow stays
    /// attached; a half-attached shadow is not a safe state.
    pub async fn add_shadow(
        &self,
        target: &ObjectHandle,
        mut shadow: Shadow,
    ) -> Result<ShadowHandle, ShadowError> {
        let target_id = {
            let object = target.lock();
            if object.destroyed() {
                return Err(ShadowError::TargetDestroyed(object.object_id().clone()));
            }
            object.object_id().clone()
        };

        let handle = {
            let mut inner = self.inner.lock();
            let list = inner.attachments.entry(target_id.clone()).or_default();
            if list.iter().any(|s| s.lock().shadow_id() == shadow.shadow_id()) {
                return Err(ShadowError::Duplicate {
                    target: target_id,
                    shadow_id: shadow.shadow_id().clone(),
                });
            }
            shadow.target = Some(target_id.clone());
            let handle: ShadowHandle = Arc::new(Mutex::new(shadow));
            list.push(Arc::clone(&handle));
            let mut keyed: Vec<(i64, ShadowHandle)> = list
                .drain(..)
                .map(|s| {
                    let priority = s.lock().priority();
                    (priority, s)
                })
                .collect();
            keyed.sort_by(|a, b| b.0.cmp(&a.0));
            *list = keyed.into_iter().map(|(_, s)| s).collect();
            inner.views.remove(&target_id);
            handle
        };

        self.run_shadow_hook(&handle, hooks::ON_ATTACH, &target_id).await;
        Ok(handle)
    }

    /// Detach a shadow by id. Unknown ids return false.
    pub async fn remove_shadow(&self, target_id: &ObjectId, shadow_id: &ShadowId) -> bool {
        let handle = {
            let inner = self.inner.lock();
            inner.attachments.get(target_id).and_then(|list| {
                list.iter().find(|s| s.lock().shadow_id() == shadow_id).cloned()
            })
        };
        let Some(handle) = handle else {
            return false;
        };

        self.run_shadow_hook(&handle, hooks::ON_DETACH, target_id).await;
        handle.lock().target = None;

        let mut inner = self.inner.lock();
        if let Some(list) = inner.attachments.get_mut(target_id) {
            list.retain(|s| !Arc::ptr_eq(s, &handle));
            if list.is_empty() {
                inner.attachments.remove(target_id);
            }
        }
        inner.views.remove(target_id);
        true
    }

    /// First attached shadow of the given type, respecting priority order.
    pub fn find_shadow(&self, target_id: &ObjectId, shadow_type: &str) -> Option<ShadowHandle> {
        self.inner
            .lock()
            .attachments
            .get(target_id)?
            .iter()
            .find(|s| s.lock().shadow_type() == shadow_type)
            .cloned()
    }

    pub fn has_shadows(&self, target_id: &ObjectId) -> bool {
        self.inner.lock().attachments.contains_key(target_id)
    }

    /// Snapshot of the target's shadow list in priority order.
    pub fn get_shadows(&self, target_id: &ObjectId) -> Vec<ShadowHandle> {
        self.inner
            .lock()
            .attachments
            .get(target_id)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Detach every shadow from a target, in priority order, firing each
    /// `on_detach`.
    pub async fn clear_shadows(&self, target_id: &ObjectId) {
        self.cleanup_for_object(target_id).await;
    }

    pub async fn cleanup_for_object(&self, target_id: &ObjectId) {
        let shadows = {
            let mut inner = self.inner.lock();
            inner.views.remove(target_id);
            inner.attachments.remove(target_id).unwrap_or_default()
        };
        for handle in shadows {
            self.run_shadow_hook(&handle, hooks::ON_DETACH, target_id).await;
            handle.lock().target = None;
        }
    }

    /// Wrap an object in its shadow-intercepted view.
    ///
    /// Views are cached per target identity and invalidated whenever the
    /// target's shadow list changes. A target with no shadows gets a
    /// passthrough view with identical reads.
    pub fn wrap_with_proxy(&self, handle: &ObjectHandle) -> ObjectView {
        let target_id = handle.lock().object_id().clone();
        let mut inner = self.inner.lock();
        if let Some(view) = inner.views.get(&target_id) {
            return view.clone();
        }
        let view = ObjectView {
            target: Arc::clone(handle),
            host: Arc::clone(&self.host),
            registry: self.this.clone(),
        };
        inner.views.insert(target_id, view.clone());
        view
    }

    pub fn stats(&self) -> ShadowStats {
        let inner = self.inner.lock();
        let mut stats = ShadowStats {
            shadowed_objects: inner.attachments.len(),
            ..ShadowStats::default()
        };
        for list in inner.attachments.values() {
            stats.total_shadows += list.len();
            for shadow in list {
                *stats.by_type.entry(shadow.lock().shadow_type().to_string()).or_default() += 1;
            }
        }
        stats
    }

    /// Detach everything; used at driver shutdown.
    pub async fn clear_all(&self) {
        let targets: Vec<ObjectId> = self.inner.lock().attachments.keys().cloned().collect();
        for target_id in targets {
            self.cleanup_for_object(&target_id).await;
        }
        self.inner.lock().views.clear();
    }

    async fn run_shadow_hook(&self, handle: &ShadowHandle, function: &str, target_id: &ObjectId) {
        let (script, mut state) = {
            let mut shadow = handle.lock();
            let script = match shadow.script() {
                Some(script) => Arc::clone(script),
                None => return,
            };
            (script, shadow.take_state())
        };
        let result = self.host.call_hook(
            &script,
            function,
            &mut state,
            (target_id.as_str().to_string(),),
        );
        handle.lock().restore_state(state);
        if let Err(err) = result {
            let shadow_id = handle.lock().shadow_id().clone();
            tracing::warn!(%shadow_id, hook = function, %err, "shadow hook failed");
        }
    }
}

/// Shadow-intercepted view of one object.
///
/// This is the proxy of the shadow design, rendered as a message-send
/// vocabulary: [`get`](Self::get) for property reads, [`set`](Self::set) for
/// write-through property writes, and [`call`](Self::call) for method
/// dispatch through the shadow chain. [`original`](Self::original) unwraps
/// to the raw handle; wrapping is idempotent because views are cached per
/// target.
#[derive(Clone)]
pub struct ObjectView {
    target: ObjectHandle,
    host: Arc<ScriptHost>,
    registry: Weak<ShadowRegistry>,
}

impl ObjectView {
    /// Live shadow list of the target; empty once the registry is gone.
    fn shadow_chain(&self, target_id: &ObjectId) -> Vec<ShadowHandle> {
        self.registry
            .upgrade()
            .map(|registry| registry.get_shadows(target_id))
            .unwrap_or_default()
    }

    /// The unwrapped target handle.
    pub fn original(&self) -> ObjectHandle {
        Arc::clone(&self.target)
    }

    pub fn target_id(&self) -> ObjectId {
        self.target.lock().object_id().clone()
    }

    /// True for every view; lets callers detect an interception layer.
    pub fn is_proxy(&self) -> bool {
        true
    }

    /// Two views over the same target are interchangeable.
    pub fn ptr_eq(&self, other: &ObjectView) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }

    /// Read a property through the shadow chain.
    ///
    /// Resolution order: unshadowable identity/containment keys come straight
    /// from the target; otherwise the first active shadow owning the key wins
    /// (priority order, insertion-stable); otherwise the target's property.
    pub fn get(&self, key: &str) -> Option<Dynamic> {
        if UNSHADOWABLE_KEYS.contains(&key) {
            return Some(self.identity_value(key));
        }
        let target_id = self.target_id();
        for handle in self.shadow_chain(&target_id) {
            let shadow = handle.lock();
            if !shadow.is_active() {
                continue;
            }
            if let Some(value) = shadow.override_value(key) {
                return Some(value);
            }
        }
        self.target.lock().props().get(key).cloned()
    }

    /// Write a property. Writes always pass through to the target; shadows
    /// layer reads only.
    pub fn set(&self, key: &str, value: Dynamic) {
        let mut object = self.target.lock();
        object.props_mut().insert(key.into(), value);
        object.sync_from_props();
    }

    /// Call a script method through the shadow chain.
    ///
    /// The first active shadow whose script defines the method handles it,
    /// with `this` bound to the shadow's own state. Otherwise the target's
    /// script runs with `this` bound to the target's properties.
    pub fn call(&self, method: &str, args: Vec<Dynamic>) -> Result<Dynamic, ScriptError> {
        let target_id = self.target_id();
        for handle in self.shadow_chain(&target_id) {
            let (script, active) = {
                let shadow = handle.lock();
                (shadow.script().cloned(), shadow.is_active())
            };
            let Some(script) = script else { continue };
            if !active || !script.has_fn(method) {
                continue;
            }
            let mut state = handle.lock().take_state();
            let result = self.host.call_hook(&script, method, &mut state, args);
            handle.lock().restore_state(state);
            return result;
        }

        let script = Arc::clone(self.target.lock().script());
        if script.has_fn(method) {
            return run_hook_on_object(&self.host, &self.target, method, args);
        }
        Err(ScriptError::MissingFunction {
            path: self.target.lock().object_path().clone(),
            function: method.to_string(),
        })
    }

    fn identity_value(&self, key: &str) -> Dynamic {
        let object = self.target.lock();
        match key {
            "object_id" => Dynamic::from(object.object_id().as_str().to_string()),
            "object_path" => Dynamic::from(object.object_path().as_str().to_string()),
            "is_clone" => Dynamic::from(object.is_clone()),
            "blueprint" => match object.blueprint_path() {
                Some(path) => Dynamic::from(path.as_str().to_string()),
                None => Dynamic::UNIT,
            },
            "environment" => match object.environment() {
                Some(id) => Dynamic::from(id.as_str().to_string()),
                None => Dynamic::UNIT,
            },
            "inventory" => Dynamic::from_array(
                object
                    .inventory()
                    .iter()
                    .map(|id| Dynamic::from(id.as_str().to_string()))
                    .collect(),
            ),
            _ => Dynamic::UNIT,
        }
    }
}

#[cfg(test)]
#[path = "shadow_tests.rs"]
mod tests;
