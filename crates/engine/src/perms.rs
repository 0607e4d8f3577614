// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permissions
//!
//! Four-tier authority model with domain-gated writes and an audit trail.
//! Reads and executes are open to every authenticated player; writes are
//! decided by level, domain prefixes, and the protected path set. Every
//! check appends an audit entry naming the rule that fired. Audit failures
//! never block the audited action, and denials are records, not errors.

use em_core::{
    normalize_content_path, AuditAction, AuditEntry, Clock, PermissionLevel, PermissionsData,
    AUDIT_LOG_CAPACITY,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Name used in audit entries for privileged internal access.
const DRIVER_NAME: &str = "driver";

/// Default path prefixes only administrators may modify.
pub const DEFAULT_PROTECTED_PATHS: [&str; 3] = ["/std/", "/daemons/", "/core/"];

/// Prefix senior builders may always write under.
const LIB_PREFIX: &str = "/lib/";

#[derive(Default)]
struct PermsInner {
    levels: HashMap<String, PermissionLevel>,
    domains: HashMap<String, Vec<String>>,
    audit: VecDeque<AuditEntry>,
}

pub struct Permissions<C: Clock> {
    clock: C,
    protected: Vec<String>,
    inner: Mutex<PermsInner>,
}

impl<C: Clock> Permissions<C> {
    pub fn new(clock: C) -> Self {
        Self::with_protected(clock, DEFAULT_PROTECTED_PATHS.iter().map(|p| p.to_string()))
    }

    pub fn with_protected(clock: C, protected: impl IntoIterator<Item = String>) -> Self {
        Self {
            clock,
            protected: protected.into_iter().map(|p| normalize_domain(&p)).collect(),
            inner: Mutex::new(PermsInner::default()),
        }
    }

    pub fn level_for(&self, name: &str) -> PermissionLevel {
        self.inner
            .lock()
            .levels
            .get(&fold_name(name))
            .copied()
            .unwrap_or_default()
    }

    /// Level of the player controlling an object, read from its `name`
    /// property. Objects without a name are plain players.
    pub fn level_for_object(&self, handle: &crate::object::ObjectHandle) -> PermissionLevel {
        let name = {
            let object = handle.lock();
            object.props().get("name").and_then(|v| v.clone().into_string().ok())
        };
        match name {
            Some(name) => self.level_for(&name),
            None => PermissionLevel::default(),
        }
    }

    pub fn set_level(&self, name: &str, level: PermissionLevel) {
        self.inner.lock().levels.insert(fold_name(name), level);
    }

    pub fn has_level(&self, name: &str, min: PermissionLevel) -> bool {
        self.level_for(name) >= min
    }

    pub fn is_admin(&self, name: &str) -> bool {
        self.has_level(name, PermissionLevel::Administrator)
    }

    pub fn is_builder(&self, name: &str) -> bool {
        self.has_level(name, PermissionLevel::Builder)
    }

    /// Read access. The driver (no player) and every authenticated player
    /// may read; the check exists for its audit trail.
    pub fn can_read(&self, player: Option<&str>, path: &str) -> bool {
        let target = normalize_content_path(path);
        let (who, detail) = match player {
            None => (DRIVER_NAME.to_string(), "driver access"),
            Some(name) => (fold_name(name), "authenticated read"),
        };
        self.audit(who, AuditAction::Read, target, true, detail.to_string());
        true
    }

    /// Execute access mirrors read policy.
    pub fn can_execute(&self, player: Option<&str>, path: &str) -> bool {
        let target = normalize_content_path(path);
        let (who, detail) = match player {
            None => (DRIVER_NAME.to_string(), "driver access"),
            Some(name) => (fold_name(name), "authenticated execute"),
        };
        self.audit(who, AuditAction::Execute, target, true, detail.to_string());
        true
    }

    /// Write access, decided by level, domains, and protected paths.
    pub fn can_write(&self, player: Option<&str>, path: &str) -> bool {
        let target = normalize_content_path(path);
        let Some(name) = player else {
            self.audit(
                DRIVER_NAME.to_string(),
                AuditAction::Write,
                target,
                true,
                "driver access".to_string(),
            );
            return true;
        };
        let name = fold_name(name);
        let level = self.level_for(&name);
        let protected = self.protected_hit(&target);
        let domain = self.domain_hit(&name, &target);

        let (allowed, detail) = match level {
            PermissionLevel::Administrator => (true, "administrator".to_string()),
            PermissionLevel::SeniorBuilder => {
                if path_in_prefix(&target, LIB_PREFIX) {
                    (true, format!("senior builder under {LIB_PREFIX}"))
                } else {
                    match (&domain, &protected) {
                        (Some(d), None) => (true, format!("domain {d}")),
                        (Some(d), Some(p)) => {
                            (false, format!("domain {d} overridden by protected {p}"))
                        }
                        (None, Some(p)) => (false, format!("protected {p}")),
                        (None, None) => (false, "no matching domain".to_string()),
                    }
                }
            }
            PermissionLevel::Builder => match (&domain, &protected) {
                (Some(d), None) => (true, format!("domain {d}")),
                (Some(d), Some(p)) => (false, format!("domain {d} overridden by protected {p}")),
                (None, Some(p)) => (false, format!("protected {p}")),
                (None, None) => (false, "no matching domain".to_string()),
            },
            PermissionLevel::Player => (false, "insufficient level".to_string()),
        };

        self.audit(name, AuditAction::Write, target, allowed, detail);
        allowed
    }

    // -- domain management ---------------------------------------------------

    pub fn add_domain(&self, name: &str, domain: &str) {
        let name = fold_name(name);
        let domain = normalize_domain(domain);
        let mut inner = self.inner.lock();
        let domains = inner.domains.entry(name).or_default();
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }

    pub fn remove_domain(&self, name: &str, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        let mut inner = self.inner.lock();
        let Some(domains) = inner.domains.get_mut(&fold_name(name)) else {
            return false;
        };
        let before = domains.len();
        domains.retain(|d| d != &domain);
        domains.len() != before
    }

    pub fn set_domains(&self, name: &str, domains: impl IntoIterator<Item = String>) {
        let normalized = domains.into_iter().map(|d| normalize_domain(&d)).collect();
        self.inner.lock().domains.insert(fold_name(name), normalized);
    }

    pub fn has_domain(&self, name: &str, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        self.inner
            .lock()
            .domains
            .get(&fold_name(name))
            .is_some_and(|domains| domains.contains(&domain))
    }

    pub fn get_domains(&self, name: &str) -> Vec<String> {
        self.inner
            .lock()
            .domains
            .get(&fold_name(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn all_domains(&self) -> BTreeMap<String, Vec<String>> {
        self.inner
            .lock()
            .domains
            .iter()
            .map(|(name, domains)| (name.clone(), domains.clone()))
            .collect()
    }

    // -- audit trail ---------------------------------------------------------

    /// Most recent entries, newest first.
    pub fn audit_log(&self, count: usize) -> Vec<AuditEntry> {
        self.inner.lock().audit.iter().rev().take(count).cloned().collect()
    }

    pub fn audit_log_for(&self, player: &str, count: usize) -> Vec<AuditEntry> {
        let player = fold_name(player);
        self.inner
            .lock()
            .audit
            .iter()
            .rev()
            .filter(|entry| entry.player == player)
            .take(count)
            .cloned()
            .collect()
    }

    pub fn audit_len(&self) -> usize {
        self.inner.lock().audit.len()
    }

    pub fn clear_audit_log(&self) {
        self.inner.lock().audit.clear();
    }

    // -- persistence ---------------------------------------------------------

    pub fn export(&self) -> PermissionsData {
        let inner = self.inner.lock();
        PermissionsData {
            levels: inner.levels.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            domains: inner.domains.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Replace the level and domain tables. The audit trail is untouched.
    pub fn import(&self, data: PermissionsData) {
        let mut inner = self.inner.lock();
        inner.levels = data
            .levels
            .into_iter()
            .map(|(name, level)| (fold_name(&name), level))
            .collect();
        inner.domains = data
            .domains
            .into_iter()
            .map(|(name, domains)| {
                (fold_name(&name), domains.iter().map(|d| normalize_domain(d)).collect())
            })
            .collect();
    }

    fn protected_hit(&self, target: &str) -> Option<String> {
        self.protected
            .iter()
            .find(|prefix| path_in_prefix(target, prefix))
            .cloned()
    }

    fn domain_hit(&self, name: &str, target: &str) -> Option<String> {
        self.inner
            .lock()
            .domains
            .get(name)
            .and_then(|domains| {
                domains.iter().find(|domain| path_in_prefix(target, domain))
            })
            .cloned()
    }

    fn audit(&self, player: String, action: AuditAction, target: String, success: bool, detail: String) {
        let mut inner = self.inner.lock();
        inner.audit.push_back(AuditEntry {
            at_ms: self.clock.epoch_ms(),
            player,
            action,
            target,
            success,
            detail,
        });
        while inner.audit.len() > AUDIT_LOG_CAPACITY {
            inner.audit.pop_front();
        }
    }
}

fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalize a domain to a `/`-terminated canonical prefix.
fn normalize_domain(domain: &str) -> String {
    let mut normalized = normalize_content_path(domain);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// True when `target` sits under `prefix` (or names the prefix directory
/// itself).
fn path_in_prefix(target: &str, prefix: &str) -> bool {
    target.starts_with(prefix) || target == prefix.trim_end_matches('/')
}

#[cfg(test)]
#[path = "perms_tests.rs"]
mod tests;
