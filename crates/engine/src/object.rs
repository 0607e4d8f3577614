// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Game objects
//!
//! The universal entity of the world. Identity and containment live in typed
//! fields owned by the registry's arena; mutable script state lives in the
//! property map that hooks receive as `this`. Reserved keys in that map
//! (`short_desc`, `long_desc`, `ids`, `actions`) are mirrored back into the
//! typed fields after every hook run.

use crate::script::{self, ScriptError, ScriptHost, ScriptRef};
use em_core::{fold_verb, ActionBinding, ObjectId, ObjectPath};
use parking_lot::Mutex;
use rhai::{Dynamic, FuncArgs, Map};
use std::sync::Arc;

/// Shared handle to a live game object.
pub type ObjectHandle = Arc<Mutex<GameObject>>;

/// Reserved property keys mirrored into typed fields.
pub const KEY_SHORT_DESC: &str = "short_desc";
pub const KEY_LONG_DESC: &str = "long_desc";
pub const KEY_IDS: &str = "ids";
pub const KEY_ACTIONS: &str = "actions";

#[derive(Debug)]
pub struct GameObject {
    object_path: ObjectPath,
    object_id: ObjectId,
    is_clone: bool,
    blueprint: Option<ObjectPath>,
    short_desc: String,
    long_desc: String,
    ids: Vec<String>,
    environment: Option<ObjectId>,
    inventory: Vec<ObjectId>,
    actions: Vec<ActionBinding>,
    props: Map,
    script: ScriptRef,
    destroyed: bool,
}

impl GameObject {
    /// Construct a blueprint instance for a content path.
    pub fn blueprint(path: ObjectPath, script: ScriptRef) -> Self {
        let object_id = ObjectId::blueprint(&path);
        Self::with_identity(path, object_id, false, None, script)
    }

    /// Construct a clone with a registry-allocated id.
    pub fn clone_of(path: ObjectPath, object_id: ObjectId, script: ScriptRef) -> Self {
        let blueprint = Some(path.clone());
        Self::with_identity(path, object_id, true, blueprint, script)
    }

    fn with_identity(
        object_path: ObjectPath,
        object_id: ObjectId,
        is_clone: bool,
        blueprint: Option<ObjectPath>,
        script: ScriptRef,
    ) -> Self {
        let mut props = Map::new();
        // Seeded for script convenience; the typed fields stay authoritative.
        props.insert("object_id".into(), Dynamic::from(object_id.as_str().to_string()));
        props.insert("object_path".into(), Dynamic::from(object_path.as_str().to_string()));
        Self {
            object_path,
            object_id,
            is_clone,
            blueprint,
            short_desc: String::new(),
            long_desc: String::new(),
            ids: Vec::new(),
            environment: None,
            inventory: Vec::new(),
            actions: Vec::new(),
            props,
            script,
            destroyed: false,
        }
    }

    pub fn object_path(&self) -> &ObjectPath {
        &self.object_path
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    pub fn is_clone(&self) -> bool {
        self.is_clone
    }

    /// Blueprint path for clones; `None` for blueprint instances.
    pub fn blueprint_path(&self) -> Option<&ObjectPath> {
        self.blueprint.as_ref()
    }

    pub fn script(&self) -> &ScriptRef {
        &self.script
    }

    pub fn short_desc(&self) -> &str {
        &self.short_desc
    }

    pub fn long_desc(&self) -> &str {
        &self.long_desc
    }

    pub fn set_short_desc(&mut self, desc: impl Into<String>) {
        self.short_desc = desc.into();
        self.props.insert(KEY_SHORT_DESC.into(), Dynamic::from(self.short_desc.clone()));
    }

    pub fn set_long_desc(&mut self, desc: impl Into<String>) {
        self.long_desc = desc.into();
        self.props.insert(KEY_LONG_DESC.into(), Dynamic::from(self.long_desc.clone()));
    }

    pub fn environment(&self) -> Option<&ObjectId> {
        self.environment.as_ref()
    }

    pub fn inventory(&self) -> &[ObjectId] {
        &self.inventory
    }

    pub fn destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    /// Match a name against the explicit id set, falling back to the
    /// whitespace-split tokens of the short description.
    pub fn matches_id(&self, name: &str) -> bool {
        let folded = name.trim().to_lowercase();
        if folded.is_empty() {
            return false;
        }
        if self.ids.iter().any(|id| id.to_lowercase() == folded) {
            return true;
        }
        self.short_desc
            .split_whitespace()
            .any(|token| token.to_lowercase() == folded)
    }

    /// Register an action verb; replaces any prior binding for the verb.
    pub fn add_action(&mut self, verb: &str, handler: impl Into<String>, priority: i64) {
        let binding = ActionBinding::new(verb, handler, priority);
        self.actions.retain(|a| a.verb != binding.verb);
        let mut actions_map = self
            .props
            .get(KEY_ACTIONS)
            .and_then(|v| v.clone().try_cast::<Map>())
            .unwrap_or_default();
        let mut entry = Map::new();
        entry.insert("handler".into(), Dynamic::from(binding.handler.clone()));
        entry.insert("priority".into(), Dynamic::from(binding.priority));
        actions_map.insert(binding.verb.as_str().into(), Dynamic::from_map(entry));
        self.props.insert(KEY_ACTIONS.into(), Dynamic::from_map(actions_map));
        self.actions.push(binding);
    }

    pub fn remove_action(&mut self, verb: &str) -> bool {
        let folded = fold_verb(verb);
        let before = self.actions.len();
        self.actions.retain(|a| a.verb != folded);
        if let Some(mut map) = self.props.get(KEY_ACTIONS).and_then(|v| v.clone().try_cast::<Map>())
        {
            map.remove(folded.as_str());
            self.props.insert(KEY_ACTIONS.into(), Dynamic::from_map(map));
        }
        self.actions.len() != before
    }

    pub fn actions(&self) -> &[ActionBinding] {
        &self.actions
    }

    /// Binding for a folded verb, if registered.
    pub fn action_for(&self, verb: &str) -> Option<&ActionBinding> {
        let folded = fold_verb(verb);
        self.actions.iter().find(|a| a.verb == folded)
    }

    pub fn props(&self) -> &Map {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut Map {
        &mut self.props
    }

    /// Move the property map out for a hook run; pair with [`restore_props`].
    ///
    /// Hooks execute against the detached map so a script can never deadlock
    /// against its own object lock.
    pub fn take_props(&mut self) -> Map {
        std::mem::take(&mut self.props)
    }

    pub fn restore_props(&mut self, props: Map) {
        self.props = props;
    }

    /// Mirror reserved property keys back into the typed fields.
    pub fn sync_from_props(&mut self) {
        if let Some(desc) = self.props.get(KEY_SHORT_DESC).and_then(dynamic_string) {
            self.short_desc = desc;
        }
        if let Some(desc) = self.props.get(KEY_LONG_DESC).and_then(dynamic_string) {
            self.long_desc = desc;
        }
        if let Some(values) = self.props.get(KEY_IDS) {
            if let Some(array) = values.clone().try_cast::<rhai::Array>() {
                self.ids = array.into_iter().filter_map(|v| v.into_string().ok()).collect();
            }
        }
        if let Some(map) = self.props.get(KEY_ACTIONS).and_then(|v| v.clone().try_cast::<Map>()) {
            let mut bindings = Vec::with_capacity(map.len());
            for (verb, value) in &map {
                if let Some(binding) = binding_from_dynamic(verb.as_str(), value) {
                    bindings.push(binding);
                }
            }
            self.actions = bindings;
        }
    }

    /// Properties as a JSON map, suitable for persistence.
    pub fn properties_json(&self) -> serde_json::Map<String, serde_json::Value> {
        script::props_to_json(&self.props)
    }

    /// Merge persisted properties onto the object, leaving identity fields
    /// untouched, then re-mirror reserved keys.
    pub fn apply_properties(&mut self, state: &serde_json::Map<String, serde_json::Value>) {
        for (key, value) in script::json_to_props(state) {
            if key == "object_id" || key == "object_path" {
                continue;
            }
            self.props.insert(key, value);
        }
        self.sync_from_props();
    }

    // Containment writes are crate-private: the registry's arena is the only
    // component allowed to rewrite the tree.
    pub(crate) fn set_environment(&mut self, environment: Option<ObjectId>) {
        self.environment = environment;
    }

    pub(crate) fn inventory_push(&mut self, id: ObjectId) {
        self.inventory.push(id);
    }

    pub(crate) fn inventory_remove(&mut self, id: &ObjectId) -> bool {
        let before = self.inventory.len();
        self.inventory.retain(|item| item != id);
        self.inventory.len() != before
    }

    pub(crate) fn clear_inventory(&mut self) {
        self.inventory.clear();
    }

    pub(crate) fn replace_script(&mut self, script: ScriptRef) {
        self.script = script;
    }
}

fn dynamic_string(value: &Dynamic) -> Option<String> {
    value.clone().into_string().ok()
}

fn binding_from_dynamic(verb: &str, value: &Dynamic) -> Option<ActionBinding> {
    if let Ok(handler) = value.clone().into_string() {
        return Some(ActionBinding::new(verb, handler, 0));
    }
    let map = value.clone().try_cast::<Map>()?;
    let handler = map.get("handler")?.clone().into_string().ok()?;
    let priority = map.get("priority").and_then(|p| p.as_int().ok()).unwrap_or(0);
    Some(ActionBinding::new(verb, handler, priority))
}

/// Run a script hook against an object handle.
///
/// Takes the property map out, runs the hook, restores the map, and
/// re-mirrors reserved keys. The object lock is never held while the script
/// executes.
pub(crate) fn run_hook_on_object(
    host: &ScriptHost,
    handle: &ObjectHandle,
    function: &str,
    args: impl FuncArgs,
) -> Result<Dynamic, ScriptError> {
    let (script, mut props) = {
        let mut object = handle.lock();
        (Arc::clone(object.script()), object.take_props())
    };
    let result = host.call_hook(&script, function, &mut props, args);
    {
        let mut object = handle.lock();
        object.restore_props(props);
        object.sync_from_props();
    }
    result
}

/// Compile a throwaway script for tests.
#[cfg(test)]
pub(crate) fn test_script(host: &ScriptHost, path: &str, source: &str) -> ScriptRef {
    #[allow(clippy::unwrap_used)]
    Arc::new(host.compile(&ObjectPath::new(path), source).unwrap())
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
