// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action bindings
//!
//! An action maps a verb to a handler function on the object that declared
//! it. Verbs are case-folded at registration; ties between handlers for the
//! same verb are broken by priority (higher first), then registration order.

use serde::{Deserialize, Serialize};

/// A verb registered on a game object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBinding {
    /// Case-folded verb.
    pub verb: String,
    /// Name of the script function invoked when the verb matches.
    pub handler: String,
    /// Higher priority handlers are consulted first.
    #[serde(default)]
    pub priority: i64,
}

impl ActionBinding {
    pub fn new(verb: impl AsRef<str>, handler: impl Into<String>, priority: i64) -> Self {
        Self { verb: fold_verb(verb.as_ref()), handler: handler.into(), priority }
    }
}

/// Case-fold a verb for matching.
pub fn fold_verb(verb: &str) -> String {
    verb.trim().to_lowercase()
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
