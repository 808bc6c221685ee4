// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Effective permission resolution.

use std::sync::Arc;

use dashmap::DashMap;

use super::{AuthResult, Permission, PermissionSet, RoleRepository};

/// Resolves and caches the effective permissions of users.
///
/// A user's permissions are the union of the permissions of every role
/// assigned to them. The first lookup for a user populates the cache; later
/// role changes are invisible until [`clear_cache`](Self::clear_cache) or
/// [`clear_user_cache`](Self::clear_user_cache) is called.
pub struct PermissionService {
    repository: Arc<dyn RoleRepository>,
    cache: DashMap<String, Arc<PermissionSet>>,
}

impl PermissionService {
    /// Creates a new service backed by a role repository.
    pub fn new(repository: Arc<dyn RoleRepository>) -> Self {
        Self {
            repository,
            cache: DashMap::new(),
        }
    }

    /// Returns the effective permission set of a user.
    pub async fn get_user_permissions(&self, user_id: &str) -> AuthResult<Arc<PermissionSet>> {
        if let Some(cached) = self.cache.get(user_id) {
            return Ok(Arc::clone(&cached));
        }

        let roles = self.repository.roles_for_user(user_id).await?;
        let mut permissions = PermissionSet::new();
        for role in &roles {
            permissions.extend(role.permissions.iter().cloned());
        }

        tracing::debug!(
            user_id = %user_id,
            roles = roles.len(),
            permissions = permissions.len(),
            "Resolved user permissions"
        );

        let permissions = Arc::new(permissions);
        // A concurrent resolver may have won the race; keep whichever landed first.
        let entry = self
            .cache
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::clone(&permissions));
        Ok(Arc::clone(&entry))
    }

    /// Returns `true` if the user holds the permission.
    pub async fn user_has_permission(&self, user_id: &str, permission: &Permission) -> AuthResult<bool> {
        Ok(self.get_user_permissions(user_id).await?.contains(permission))
    }

    /// Returns `true` if the user holds at least one of the permissions.
    ///
    /// An empty list yields `false`.
    pub async fn user_has_any_permission(
        &self,
        user_id: &str,
        permissions: &[Permission],
    ) -> AuthResult<bool> {
        if permissions.is_empty() {
            return Ok(false);
        }
        Ok(self.get_user_permissions(user_id).await?.contains_any(permissions))
    }

    /// Returns `true` if the user holds every one of the permissions.
    ///
    /// An empty list yields `true`.
    pub async fn user_has_all_permissions(
        &self,
        user_id: &str,
        permissions: &[Permission],
    ) -> AuthResult<bool> {
        if permissions.is_empty() {
            return Ok(true);
        }
        Ok(self.get_user_permissions(user_id).await?.contains_all(permissions))
    }

    /// Drops every cached permission set.
    pub fn clear_cache(&self) {
        let count = self.cache.len();
        self.cache.clear();
        tracing::info!(entries = count, "Permission cache cleared");
    }

    /// Drops the cached permission set of one user.
    pub fn clear_user_cache(&self, user_id: &str) -> bool {
        let removed = self.cache.remove(user_id).is_some();
        tracing::debug!(user_id = %user_id, removed, "Permission cache entry cleared");
        removed
    }

    /// Returns the number of cached users.
    pub fn cached_users(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService")
            .field("cached_users", &self.cache.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
