// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command dispatch
//!
//! Matches an actor's input line against action verbs registered on objects
//! sharing its environment: the actor itself, its inventory, the room, and
//! the room's other occupants. Handlers run in priority order (higher
//! first, registration order on ties) until one accepts; a handler
//! returning `false` passes the command along.

use crate::object::{run_hook_on_object, ObjectHandle};
use crate::registry::ObjectRegistry;
use em_core::{fold_verb, Clock, ObjectId};
use rhai::Dynamic;
use std::sync::Arc;

/// Outcome of one dispatched command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// An action handler accepted the command.
    Handled { object: ObjectId, verb: String },
    NotHandled,
}

pub struct CommandDispatcher<C: Clock> {
    registry: Arc<ObjectRegistry<C>>,
}

impl<C: Clock> CommandDispatcher<C> {
    pub fn new(registry: Arc<ObjectRegistry<C>>) -> Self {
        Self { registry }
    }

    /// Dispatch an input line issued by `actor`.
    ///
    /// Handler failures are logged and treated as "not handled" so one
    /// broken action can never eat the whole command set.
    pub async fn dispatch(&self, actor: &ObjectHandle, line: &str) -> DispatchResult {
        let line = line.trim();
        if line.is_empty() {
            return DispatchResult::NotHandled;
        }
        let (verb_raw, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let verb = fold_verb(verb_raw);
        let actor_id = actor.lock().object_id().clone();

        let mut matched: Vec<(i64, usize, ObjectHandle, String)> = Vec::new();
        for (seq, handle) in self.candidates(actor).into_iter().enumerate() {
            let binding = handle.lock().action_for(&verb).cloned();
            if let Some(binding) = binding {
                matched.push((binding.priority, seq, handle, binding.handler));
            }
        }
        matched.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        for (_, _, handle, handler) in matched {
            let args = (actor_id.as_str().to_string(), rest.to_string());
            match run_hook_on_object(self.registry.host(), &handle, &handler, args) {
                Ok(result) => {
                    if declined(&result) {
                        continue;
                    }
                    return DispatchResult::Handled {
                        object: handle.lock().object_id().clone(),
                        verb,
                    };
                }
                Err(err) => {
                    let owner = handle.lock().object_id().clone();
                    tracing::warn!(object = %owner, handler, %err, "action handler failed");
                }
            }
        }
        DispatchResult::NotHandled
    }

    /// Objects whose actions the actor can trigger, in consultation order:
    /// the actor, its inventory, its environment, then the other occupants.
    fn candidates(&self, actor: &ObjectHandle) -> Vec<ObjectHandle> {
        let actor_id = actor.lock().object_id().clone();
        let mut out: Vec<ObjectHandle> = vec![Arc::clone(actor)];

        let carried: Vec<ObjectId> = actor.lock().inventory().to_vec();
        for id in &carried {
            if let Some(item) = self.registry.find(id.as_str()) {
                out.push(item);
            }
        }

        let env_id = actor.lock().environment().cloned();
        if let Some(env_id) = env_id {
            if let Some(env) = self.registry.find(env_id.as_str()) {
                let occupants: Vec<ObjectId> = env.lock().inventory().to_vec();
                out.push(env);
                for id in occupants.iter().filter(|id| **id != actor_id) {
                    if let Some(sibling) = self.registry.find(id.as_str()) {
                        out.push(sibling);
                    }
                }
            }
        }
        out
    }
}

/// A handler result of exactly `false` declines the command.
fn declined(result: &Dynamic) -> bool {
    result.as_bool().ok() == Some(false)
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
