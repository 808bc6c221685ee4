// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission definitions for RBAC.
//!
//! A permission is a dotted name such as `device.read` or
//! `system.audit_log`: a lowercase resource followed by one or more
//! segments of lowercase letters and underscores. Roles may additionally
//! grant `resource.*` (every permission under `resource.`) or `*`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wildcard that grants every permission.
pub const WILDCARD: &str = "*";

// =============================================================================
// PermissionError
// =============================================================================

/// Error returned for an invalid permission name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// Empty string.
    #[error("Permission name must not be empty")]
    Empty,

    /// The name does not follow `resource.action`.
    #[error("Invalid permission name '{0}': expected 'resource.action' in lowercase")]
    InvalidFormat(String),
}

// =============================================================================
// Permission
// =============================================================================

/// A validated permission name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    /// Parses and validates a permission name.
    pub fn parse(name: &str) -> Result<Self, PermissionError> {
        if name.is_empty() {
            return Err(PermissionError::Empty);
        }
        if name == WILDCARD {
            return Ok(Self(name.to_string()));
        }

        let invalid = || PermissionError::InvalidFormat(name.to_string());
        let mut segments = name.split('.');

        let resource = segments.next().ok_or_else(invalid)?;
        if resource.is_empty() || !resource.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(invalid());
        }

        let rest: Vec<&str> = segments.collect();
        let Some((last, middle)) = rest.split_last() else {
            return Err(invalid());
        };

        let valid_segment =
            |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase() || b == b'_');
        if !middle.iter().all(|s| valid_segment(s)) {
            return Err(invalid());
        }
        if *last != WILDCARD && !valid_segment(last) {
            return Err(invalid());
        }

        Ok(Self(name.to_string()))
    }

    /// Returns the permission name as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the resource part (`device` for `device.read`).
    pub fn resource(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Returns the action part (`read` for `device.read`).
    pub fn action(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Returns `true` for `*` and `resource.*` grants.
    pub fn is_wildcard(&self) -> bool {
        self.0 == WILDCARD || self.0.ends_with(".*")
    }

    /// Returns `true` if holding `self` satisfies a requirement for `required`.
    pub fn grants(&self, required: &Permission) -> bool {
        if self == required || self.0 == WILDCARD {
            return true;
        }
        match self.0.strip_suffix('*') {
            Some(prefix) if prefix.ends_with('.') => required.0.starts_with(prefix),
            _ => false,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Permission> for String {
    fn from(permission: Permission) -> Self {
        permission.0
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PermissionSet
// =============================================================================

/// A set of permissions, honoring wildcard grants on lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    permissions: HashSet<Permission>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a permission set from a list of permissions.
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Adds a permission to the set.
    pub fn add(&mut self, permission: Permission) {
        self.permissions.insert(permission);
    }

    /// Returns `true` if the set grants the given permission, directly or
    /// through a wildcard.
    pub fn contains(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
            || self
                .permissions
                .iter()
                .any(|granted| granted.is_wildcard() && granted.grants(permission))
    }

    /// Returns `true` if the set grants all of the given permissions.
    ///
    /// An empty list is trivially satisfied.
    pub fn contains_all(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.contains(p))
    }

    /// Returns `true` if the set grants any of the given permissions.
    ///
    /// An empty list is never satisfied.
    pub fn contains_any(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.contains(p))
    }

    /// Returns the number of permissions in the set.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Returns an iterator over the permissions.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Returns the permission names in sorted order.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut names: Vec<String> = self.permissions.iter().map(|p| p.0.clone()).collect();
        names.sort();
        names
    }

    /// Merges another permission set into this one.
    pub fn merge(&mut self, other: &PermissionSet) {
        self.permissions.extend(other.permissions.iter().cloned());
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self::from_permissions(iter)
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<I: IntoIterator<Item = Permission>>(&mut self, iter: I) {
        self.permissions.extend(iter);
    }
}

// =============================================================================
// Tests
// =============================================================================
