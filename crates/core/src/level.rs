// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission records
//!
//! The four-tier authority model, the export/import document for persisting
//! it, and the audit trail entry format. The policy engine that consumes
//! these lives in `em-engine`; this module is the shared vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Soft cap on retained audit entries.
pub const AUDIT_LOG_CAPACITY: usize = 150;

/// Authority tier of a player, ordered from least to most privileged.
///
/// Serialized as its numeric rank so the on-disk permission file reads
/// `{"alice": 2, "bob": 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PermissionLevel {
    Player,
    Builder,
    SeniorBuilder,
    Administrator,
}

impl PermissionLevel {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl Default for PermissionLevel {
    fn default() -> Self {
        Self::Player
    }
}

impl From<PermissionLevel> for u8 {
    fn from(level: PermissionLevel) -> u8 {
        level as u8
    }
}

impl TryFrom<u8> for PermissionLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Player),
            1 => Ok(Self::Builder),
            2 => Ok(Self::SeniorBuilder),
            3 => Ok(Self::Administrator),
            other => Err(format!("unknown permission level {other}")),
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Player => "player",
            Self::Builder => "builder",
            Self::SeniorBuilder => "senior-builder",
            Self::Administrator => "administrator",
        };
        write!(f, "{name}")
    }
}

/// Serialized form of the permission tables, used for persistence.
///
/// Player names are case-folded keys; domains are `/`-terminated path
/// prefixes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsData {
    #[serde(default)]
    pub levels: BTreeMap<String, PermissionLevel>,
    #[serde(default)]
    pub domains: BTreeMap<String, Vec<String>>,
}

/// File operation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Read,
    Write,
    Execute,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Execute => "execute",
        };
        write!(f, "{name}")
    }
}

/// One access-check record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Epoch milliseconds of the check.
    pub at_ms: u64,
    /// Case-folded player name, or "driver" for privileged internal access.
    pub player: String,
    pub action: AuditAction,
    /// Normalized target path.
    pub target: String,
    pub success: bool,
    /// Which rule decided the outcome.
    pub detail: String,
}

#[cfg(test)]
#[path = "level_tests.rs"]
mod tests;
