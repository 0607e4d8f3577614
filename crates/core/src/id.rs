// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object identity
//!
//! Every game object is addressed by a canonical content path
//! (`/areas/town/bakery`) and an object id. A blueprint's id equals its
//! path; a clone's id is `path#N` where `N` comes from the blueprint's
//! monotonic clone counter. Ids are allocated only by the object registry
//! and are never reused after destruction.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Separator between a clone id's path and its clone index.
pub const CLONE_SEPARATOR: char = '#';

/// Normalize a content path to its canonical form.
///
/// Canonical paths are absolute, use single `/` separators, contain no
/// `.`/`..` segments (`..` pops, but never above the root), and carry no
/// trailing slash except for the root itself.
pub fn normalize_content_path(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(raw.len() + 1);
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Sanitize a player name into a file-safe key: lowercased, alphanumerics only.
///
/// Collisions after sanitization are the caller's concern.
pub fn sanitize_player_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Canonical content path of a blueprint source, e.g. `/areas/town/bakery`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectPath(SmolStr);

impl ObjectPath {
    /// Create a path, normalizing to canonical form.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(SmolStr::new(normalize_content_path(raw.as_ref())))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The final path segment, e.g. `bakery` for `/areas/town/bakery`.
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// True if this path starts with the given prefix on a segment boundary.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.as_str().starts_with(prefix)
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ObjectPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::borrow::Borrow<str> for ObjectPath {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

/// Unique id of a live game object.
///
/// Equals the blueprint path for blueprints, `path#N` for clones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(SmolStr);

impl ObjectId {
    /// Id of the blueprint registered at `path`.
    pub fn blueprint(path: &ObjectPath) -> Self {
        Self(SmolStr::new(path.as_str()))
    }

    /// Id of clone number `index` of the blueprint at `path`.
    pub fn clone_of(path: &ObjectPath, index: u64) -> Self {
        Self(SmolStr::new(format!("{}{}{}", path.as_str(), CLONE_SEPARATOR, index)))
    }

    /// Parse an id from an arbitrary string (lookups, deserialization).
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The content path component, with any clone index stripped.
    pub fn path(&self) -> ObjectPath {
        match self.0.split_once(CLONE_SEPARATOR) {
            Some((path, _)) => ObjectPath::new(path),
            None => ObjectPath::new(self.0.as_str()),
        }
    }

    /// Clone index, or `None` for blueprint ids.
    pub fn clone_index(&self) -> Option<u64> {
        let (_, index) = self.0.split_once(CLONE_SEPARATOR)?;
        index.parse().ok()
    }

    pub fn is_clone_id(&self) -> bool {
        self.0.contains(CLONE_SEPARATOR)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<&ObjectPath> for ObjectId {
    fn from(path: &ObjectPath) -> Self {
        Self::blueprint(path)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::borrow::Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for ObjectId {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

impl PartialEq<&str> for ObjectId {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_str() == *other
    }
}

/// Monotonic id of a scheduled call-out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CallOutId(pub u64);

impl std::fmt::Display for CallOutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique id of a shadow attachment, scoped per target object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShadowId(SmolStr);

impl ShadowId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ShadowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShadowId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
