// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object registry
//!
//! Sole allocator of object ids, sole owner of the blueprint table, and the
//! only component that creates or destroys game objects. The containment
//! tree is an id-indexed arena behind one lock, so environment/inventory
//! updates are atomic pairs.
//!
//! Lock order: the registry's inner lock is taken before any object lock,
//! and no two object locks are ever held at once.

use crate::object::{run_hook_on_object, GameObject, ObjectHandle};
use crate::script::{hooks, ScriptError, ScriptHost, ScriptRef};
use crate::scheduler::Scheduler;
use crate::shadow::ShadowRegistry;
use em_core::{Clock, ObjectId, ObjectPath};
use indexmap::IndexSet;
use parking_lot::Mutex;
use rhai::Dynamic;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("already registered: {0}")]
    AlreadyRegistered(ObjectId),
    #[error("unknown blueprint: {0}")]
    UnknownBlueprint(ObjectPath),
}

/// Registry record for one compiled content path.
pub struct Blueprint {
    pub(crate) path: ObjectPath,
    pub(crate) script: ScriptRef,
    pub(crate) instance: ObjectHandle,
    pub(crate) clone_counter: u64,
    pub(crate) clones: IndexSet<ObjectId>,
}

impl Blueprint {
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn script(&self) -> &ScriptRef {
        &self.script
    }

    pub fn instance(&self) -> &ObjectHandle {
        &self.instance
    }

    pub fn clone_counter(&self) -> u64 {
        self.clone_counter
    }

    pub fn clone_ids(&self) -> Vec<ObjectId> {
        self.clones.iter().cloned().collect()
    }
}

/// Result of a live blueprint swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlueprintSwap {
    pub existing_clones: usize,
    pub migrated_objects: usize,
}

/// Registry totals plus the largest inventories and busiest blueprints.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub total_objects: usize,
    pub blueprint_count: usize,
    pub clone_count: usize,
    /// Top 10 objects by inventory size.
    pub largest_inventories: Vec<(ObjectId, usize)>,
    /// Top 10 blueprints by live clone count.
    pub top_blueprints: Vec<(ObjectPath, usize)>,
}

#[derive(Default)]
struct RegistryInner {
    objects: HashMap<ObjectId, ObjectHandle>,
    blueprints: HashMap<ObjectPath, Blueprint>,
}

pub struct ObjectRegistry<C: Clock> {
    host: Arc<ScriptHost>,
    scheduler: Arc<Scheduler<C>>,
    shadows: Arc<ShadowRegistry>,
    inner: Mutex<RegistryInner>,
}

impl<C: Clock> ObjectRegistry<C> {
    pub fn new(
        host: Arc<ScriptHost>,
        scheduler: Arc<Scheduler<C>>,
        shadows: Arc<ShadowRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            host,
            scheduler,
            shadows,
            inner: Mutex::new(RegistryInner::default()),
        })
    }

    pub fn host(&self) -> &Arc<ScriptHost> {
        &self.host
    }

    pub fn scheduler(&self) -> &Arc<Scheduler<C>> {
        &self.scheduler
    }

    pub fn shadows(&self) -> &Arc<ShadowRegistry> {
        &self.shadows
    }

    /// Register a freshly compiled blueprint.
    pub fn register_blueprint(
        &self,
        script: ScriptRef,
        instance: GameObject,
    ) -> Result<ObjectHandle, RegistryError> {
        let path = instance.object_path().clone();
        let id = instance.object_id().clone();
        let mut inner = self.inner.lock();
        if inner.blueprints.contains_key(&path) || inner.objects.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        let handle: ObjectHandle = Arc::new(Mutex::new(instance));
        inner.objects.insert(id, Arc::clone(&handle));
        inner.blueprints.insert(
            path.clone(),
            Blueprint {
                path,
                script,
                instance: Arc::clone(&handle),
                clone_counter: 0,
                clones: IndexSet::new(),
            },
        );
        Ok(handle)
    }

    /// Insert an already-constructed object into the arena.
    pub fn register(&self, object: GameObject) -> Result<ObjectHandle, RegistryError> {
        let id = object.object_id().clone();
        let mut inner = self.inner.lock();
        if inner.objects.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        let handle: ObjectHandle = Arc::new(Mutex::new(object));
        inner.objects.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    /// O(1) lookup by object id or blueprint path.
    pub fn find(&self, id: impl AsRef<str>) -> Option<ObjectHandle> {
        let raw = id.as_ref();
        let key = match raw.split_once(em_core::id::CLONE_SEPARATOR) {
            Some((path, index)) => {
                ObjectId::clone_of(&ObjectPath::new(path), index.parse().ok()?)
            }
            None => ObjectId::blueprint(&ObjectPath::new(raw)),
        };
        self.inner.lock().objects.get(&key).cloned()
    }

    pub fn has_blueprint(&self, path: &ObjectPath) -> bool {
        self.inner.lock().blueprints.contains_key(path)
    }

    pub fn blueprint_instance(&self, path: &ObjectPath) -> Option<ObjectHandle> {
        self.inner.lock().blueprints.get(path).map(|bp| Arc::clone(&bp.instance))
    }

    pub fn blueprint_script(&self, path: &ObjectPath) -> Option<ScriptRef> {
        self.inner.lock().blueprints.get(path).map(|bp| Arc::clone(&bp.script))
    }

    pub fn blueprint_paths(&self) -> Vec<ObjectPath> {
        self.inner.lock().blueprints.keys().cloned().collect()
    }

    /// Live clone handles of one blueprint, in clone order.
    pub fn clones_of(&self, path: &ObjectPath) -> Vec<ObjectHandle> {
        let inner = self.inner.lock();
        let Some(bp) = inner.blueprints.get(path) else {
            return Vec::new();
        };
        bp.clones.iter().filter_map(|id| inner.objects.get(id).cloned()).collect()
    }

    /// Every live clone in the arena.
    pub fn all_clones(&self) -> Vec<ObjectHandle> {
        let inner = self.inner.lock();
        let mut clones: Vec<(ObjectId, ObjectHandle)> = inner
            .objects
            .iter()
            .filter(|(_, handle)| handle.lock().is_clone())
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect();
        clones.sort_by(|a, b| a.0.cmp(&b.0));
        clones.into_iter().map(|(_, handle)| handle).collect()
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }

    /// Clone a blueprint. Returns `None` when the path has no blueprint; the
    /// registry is left unchanged in that case.
    ///
    /// The fresh clone receives `on_create` then `on_clone(blueprint_path)`;
    /// both are awaited before the handle is returned. Hook failures are
    /// logged and do not fail the clone.
    pub async fn clone_object(&self, path: impl AsRef<str>) -> Option<ObjectHandle> {
        let path = ObjectPath::new(path.as_ref());
        let handle = {
            let mut inner = self.inner.lock();
            let bp = inner.blueprints.get_mut(&path)?;
            bp.clone_counter += 1;
            let id = ObjectId::clone_of(&path, bp.clone_counter);
            let object = GameObject::clone_of(path.clone(), id.clone(), Arc::clone(&bp.script));
            let handle: ObjectHandle = Arc::new(Mutex::new(object));
            bp.clones.insert(id.clone());
            inner.objects.insert(id, Arc::clone(&handle));
            handle
        };

        self.run_hook_logged(&handle, hooks::ON_CREATE).await;
        let blueprint_arg = path.as_str().to_string();
        if let Err(err) = run_hook_on_object(&self.host, &handle, hooks::ON_CLONE, (blueprint_arg,))
        {
            self.log_hook_failure(&handle, hooks::ON_CLONE, &err);
        }
        Some(handle)
    }

    /// Destroy an object and scrub every reference to it.
    ///
    /// Order: `on_destroy` → heartbeat strip → shadow detach → eviction from
    /// its environment → inventory released to the void → arena removal →
    /// blueprint accounting. Failures along the way are logged and the
    /// teardown continues; a destroy can never leave the object half in the
    /// world.
    pub async fn destroy(&self, handle: &ObjectHandle) {
        let id = {
            let object = handle.lock();
            if object.destroyed() {
                return;
            }
            object.object_id().clone()
        };

        self.run_hook_logged(handle, hooks::ON_DESTROY).await;
        handle.lock().mark_destroyed();

        self.scheduler.cleanup_for_object(&id);
        self.shadows.cleanup_for_object(&id).await;
        self.evict_from_environment(&id);

        let contents: Vec<ObjectId> = handle.lock().inventory().to_vec();
        for item_id in &contents {
            if let Some(item) = self.find(item_id.as_str()) {
                item.lock().set_environment(None);
            }
        }
        handle.lock().clear_inventory();

        let blueprint_path = handle.lock().blueprint_path().cloned();
        let mut inner = self.inner.lock();
        inner.objects.remove(&id);
        if let Some(path) = blueprint_path {
            if let Some(bp) = inner.blueprints.get_mut(&path) {
                bp.clones.shift_remove(&id);
            }
        }
    }

    /// Destroy every clone of a blueprint, then its instance, then drop the
    /// record.
    pub async fn unregister_blueprint(&self, path: &ObjectPath) -> Result<(), RegistryError> {
        let (clone_ids, instance) = {
            let inner = self.inner.lock();
            let bp = inner
                .blueprints
                .get(path)
                .ok_or_else(|| RegistryError::UnknownBlueprint(path.clone()))?;
            (bp.clone_ids(), Arc::clone(&bp.instance))
        };

        for id in clone_ids {
            if let Some(clone) = self.find(id.as_str()) {
                self.destroy(&clone).await;
            }
        }
        self.destroy(&instance).await;
        self.inner.lock().blueprints.remove(path);
        Ok(())
    }

    /// Live blueprint swap; hot-reload's primitive.
    ///
    /// Existing clones keep the script captured at clone time; objects
    /// sitting in the old instance's inventory are pointer-moved into the
    /// new instance without enter/leave hooks. Clone accounting and the
    /// clone counter survive the swap, so ids are never reused.
    pub fn update_blueprint(&self, script: ScriptRef, instance: GameObject) -> BlueprintSwap {
        let path = instance.object_path().clone();
        {
            let inner = self.inner.lock();
            if !inner.blueprints.contains_key(&path) {
                drop(inner);
                // first compile of this path: a plain registration
                if let Err(err) = self.register_blueprint(script, instance) {
                    tracing::warn!(%path, %err, "blueprint registration during swap failed");
                }
                return BlueprintSwap::default();
            }
        }

        let blueprint_id = ObjectId::blueprint(&path);
        let new_handle: ObjectHandle = Arc::new(Mutex::new(instance));
        let mut inner = self.inner.lock();
        let Some(bp) = inner.blueprints.get_mut(&path) else {
            return BlueprintSwap::default();
        };

        let old_handle = std::mem::replace(&mut bp.instance, Arc::clone(&new_handle));
        bp.script = script;
        let existing_clones = bp.clones.len();

        let residents: Vec<ObjectId> = old_handle.lock().inventory().to_vec();
        old_handle.lock().clear_inventory();
        old_handle.lock().mark_destroyed();
        for id in &residents {
            if let Some(resident) = inner.objects.get(id) {
                resident.lock().set_environment(Some(blueprint_id.clone()));
            }
            new_handle.lock().inventory_push(id.clone());
        }
        inner.objects.insert(blueprint_id, new_handle);

        BlueprintSwap { existing_clones, migrated_objects: residents.len() }
    }

    /// Move an object into a destination's inventory, or to the void.
    ///
    /// Atomic with respect to other moves: the arena lock is held for the
    /// whole index update. Returns false when the move would corrupt the
    /// tree (self-containment, containment cycle, destroyed endpoint).
    pub fn move_object(&self, object: &ObjectHandle, destination: Option<&ObjectHandle>) -> bool {
        let inner = self.inner.lock();
        let object_id = {
            let o = object.lock();
            if o.destroyed() {
                return false;
            }
            o.object_id().clone()
        };

        let dest_id = match destination {
            Some(dest) => {
                let d = dest.lock();
                if d.destroyed() {
                    return false;
                }
                Some(d.object_id().clone())
            }
            None => None,
        };

        if let Some(dest_id) = &dest_id {
            if *dest_id == object_id {
                return false;
            }
            // refuse containment cycles: walk up from the destination
            let mut cursor = inner
                .objects
                .get(dest_id)
                .and_then(|h| h.lock().environment().cloned());
            while let Some(current) = cursor {
                if current == object_id {
                    return false;
                }
                cursor = inner
                    .objects
                    .get(&current)
                    .and_then(|h| h.lock().environment().cloned());
            }
        }

        let old_env = object.lock().environment().cloned();
        if let Some(old_id) = &old_env {
            if let Some(old) = inner.objects.get(old_id) {
                old.lock().inventory_remove(&object_id);
            }
        }

        match (&dest_id, destination) {
            (Some(dest_id), Some(dest)) => {
                dest.lock().inventory_push(object_id.clone());
                object.lock().set_environment(Some(dest_id.clone()));
            }
            _ => object.lock().set_environment(None),
        }
        true
    }

    /// Run one object's heartbeat; called by the scheduler's runner.
    ///
    /// Tolerates objects mid-destruction: the tick snapshot may still name
    /// an object whose `on_destroy` has begun.
    pub async fn run_heartbeat(&self, id: &ObjectId) {
        let Some(handle) = self.find(id.as_str()) else {
            return;
        };
        if handle.lock().destroyed() {
            return;
        }
        self.run_hook_logged(&handle, hooks::HEARTBEAT).await;
    }

    /// Run a no-argument hook on an object, surfacing the result.
    pub async fn run_hook(
        &self,
        handle: &ObjectHandle,
        function: &str,
    ) -> Result<Dynamic, ScriptError> {
        run_hook_on_object(&self.host, handle, function, ())
    }

    async fn run_hook_logged(&self, handle: &ObjectHandle, function: &str) {
        if let Err(err) = run_hook_on_object(&self.host, handle, function, ()) {
            self.log_hook_failure(handle, function, &err);
        }
    }

    fn log_hook_failure(&self, handle: &ObjectHandle, function: &str, err: &ScriptError) {
        let id = handle.lock().object_id().clone();
        tracing::warn!(object = %id, hook = function, %err, "mudlib hook failed");
    }

    fn evict_from_environment(&self, id: &ObjectId) {
        let inner = self.inner.lock();
        let Some(handle) = inner.objects.get(id).cloned() else {
            return;
        };
        let env_id = handle.lock().environment().cloned();
        if let Some(env_id) = env_id {
            if let Some(env) = inner.objects.get(&env_id) {
                env.lock().inventory_remove(id);
            }
            handle.lock().set_environment(None);
        }
    }

    pub fn get_stats(&self) -> RegistryStats {
        let inner = self.inner.lock();
        let mut inventories: Vec<(ObjectId, usize)> = inner
            .objects
            .iter()
            .map(|(id, handle)| (id.clone(), handle.lock().inventory().len()))
            .filter(|(_, len)| *len > 0)
            .collect();
        inventories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        inventories.truncate(10);

        let mut blueprints: Vec<(ObjectPath, usize)> = inner
            .blueprints
            .values()
            .map(|bp| (bp.path.clone(), bp.clones.len()))
            .collect();
        blueprints.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        blueprints.truncate(10);

        let clone_count =
            inner.objects.values().filter(|handle| handle.lock().is_clone()).count();

        RegistryStats {
            total_objects: inner.objects.len(),
            blueprint_count: inner.blueprints.len(),
            clone_count,
            largest_inventories: inventories,
            top_blueprints: blueprints,
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
