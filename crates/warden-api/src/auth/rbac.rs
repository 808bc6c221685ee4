// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role-Based Access Control (RBAC).
//!
//! Roles and user accounts live behind the [`RoleRepository`] and
//! [`UserStore`] traits. [`InMemoryDirectory`] implements both for
//! deployments that declare their users in the configuration file.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{AuthResult, Permission, PermissionSet};

// =============================================================================
// Role
// =============================================================================

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name.
    pub name: String,
    /// Permissions granted by this role.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    /// Creates a new role.
    pub fn new(name: impl Into<String>, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().collect(),
            description: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the role's permissions as a set.
    pub fn permission_set(&self) -> PermissionSet {
        self.permissions.iter().cloned().collect()
    }
}

// =============================================================================
// UserAccount
// =============================================================================

/// A user known to the gateway.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Stable user ID (the JWT subject).
    pub id: String,
    /// Email, usable as an alternative login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Argon2 PHC password hash. Accounts without one cannot log in.
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    /// Assigned role names.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Disabled accounts can neither log in nor refresh.
    #[serde(default = "enabled")]
    pub active: bool,
}

fn enabled() -> bool {
    true
}

impl UserAccount {
    /// Creates an account with no password and no roles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            password_hash: None,
            roles: Vec::new(),
            active: true,
        }
    }

    /// Sets the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the password hash.
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Sets the roles.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the account as disabled.
    pub fn disabled(mut self) -> Self {
        self.active = false;
        self
    }

    fn matches_login(&self, login: &str) -> bool {
        self.id == login
            || self
                .email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(login))
    }
}

impl std::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("has_password", &self.password_hash.is_some())
            .field("roles", &self.roles)
            .field("active", &self.active)
            .finish()
    }
}

// =============================================================================
// Repository Traits
// =============================================================================

/// Source of role assignments.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Returns the roles assigned to a user. Unknown users have no roles.
    async fn roles_for_user(&self, user_id: &str) -> AuthResult<Vec<Role>>;
}

/// Source of user accounts for credential login.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks an account up by ID or email.
    async fn find_by_login(&self, login: &str) -> AuthResult<Option<UserAccount>>;

    /// Looks an account up by ID.
    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<UserAccount>>;
}

// =============================================================================
// InMemoryDirectory
// =============================================================================

#[derive(Debug, Default)]
struct DirectoryInner {
    roles: HashMap<String, Role>,
    users: HashMap<String, UserAccount>,
}

/// Roles and users held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryInner>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder.
    pub fn builder() -> InMemoryDirectoryBuilder {
        InMemoryDirectoryBuilder::default()
    }

    /// Defines or replaces a role.
    pub fn define_role(&self, role: Role) {
        self.inner.write().roles.insert(role.name.clone(), role);
    }

    /// Removes a role definition. Assignments referencing it become inert.
    pub fn remove_role(&self, name: &str) -> Option<Role> {
        self.inner.write().roles.remove(name)
    }

    /// Adds or replaces a user account.
    pub fn add_user(&self, account: UserAccount) {
        self.inner.write().users.insert(account.id.clone(), account);
    }

    /// Assigns a role to a user. Returns `false` if the user is unknown.
    pub fn assign_role(&self, user_id: &str, role: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.users.get_mut(user_id) {
            Some(user) => {
                if !user.roles.iter().any(|r| r == role) {
                    user.roles.push(role.to_string());
                }
                true
            }
            None => false,
        }
    }

    /// Removes a role from a user. Returns `true` if it was assigned.
    pub fn revoke_role(&self, user_id: &str, role: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.users.get_mut(user_id) {
            Some(user) => {
                let before = user.roles.len();
                user.roles.retain(|r| r != role);
                user.roles.len() != before
            }
            None => false,
        }
    }

    /// Returns a role definition.
    pub fn role(&self, name: &str) -> Option<Role> {
        self.inner.read().roles.get(name).cloned()
    }

    /// Returns a user account.
    pub fn user(&self, user_id: &str) -> Option<UserAccount> {
        self.inner.read().users.get(user_id).cloned()
    }

    /// Returns the defined role names in sorted order.
    pub fn role_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().roles.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of user accounts.
    pub fn user_count(&self) -> usize {
        self.inner.read().users.len()
    }
}

#[async_trait]
impl RoleRepository for InMemoryDirectory {
    async fn roles_for_user(&self, user_id: &str) -> AuthResult<Vec<Role>> {
        let inner = self.inner.read();
        let Some(user) = inner.users.get(user_id) else {
            return Ok(Vec::new());
        };

        let mut roles = Vec::with_capacity(user.roles.len());
        for name in &user.roles {
            match inner.roles.get(name) {
                Some(role) => roles.push(role.clone()),
                None => tracing::warn!(
                    user_id = %user_id,
                    role = %name,
                    "User is assigned an undefined role, ignoring"
                ),
            }
        }
        Ok(roles)
    }
}

#[async_trait]
impl UserStore for InMemoryDirectory {
    async fn find_by_login(&self, login: &str) -> AuthResult<Option<UserAccount>> {
        let inner = self.inner.read();
        if let Some(user) = inner.users.get(login) {
            return Ok(Some(user.clone()));
        }
        Ok(inner.users.values().find(|u| u.matches_login(login)).cloned())
    }

    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<UserAccount>> {
        Ok(self.user(user_id))
    }
}

// =============================================================================
// InMemoryDirectoryBuilder
// =============================================================================

/// Builder for [`InMemoryDirectory`].
#[derive(Debug, Default)]
pub struct InMemoryDirectoryBuilder {
    roles: Vec<Role>,
    users: Vec<UserAccount>,
}

impl InMemoryDirectoryBuilder {
    /// Adds a role.
    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    /// Adds a user.
    pub fn user(mut self, account: UserAccount) -> Self {
        self.users.push(account);
        self
    }

    /// Builds the directory.
    pub fn build(self) -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        for role in self.roles {
            directory.define_role(role);
        }
        for user in self.users {
            directory.add_user(user);
        }
        directory
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> Permission {
        Permission::parse(name).unwrap()
    }

    fn directory() -> InMemoryDirectory {
        InMemoryDirectory::builder()
            .role(Role::new("viewer", [p("device.read")]))
            .role(Role::new("operator", [p("device.read"), p("device.write")]))
            .user(
                UserAccount::new("alice")
                    .with_email("Alice@Example.com")
                    .with_roles(["viewer", "operator"]),
            )
            .user(UserAccount::new("bob").with_roles(["viewer", "ghost"]))
            .build()
    }

    #[tokio::test]
    async fn test_roles_for_user() {
        let dir = directory();
        let roles = dir.roles_for_user("alice").await.unwrap();
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["viewer", "operator"]);
    }

    #[tokio::test]
    async fn test_unknown_roles_are_skipped() {
        let dir = directory();
        let roles = dir.roles_for_user("bob").await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "viewer");
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_roles() {
        let dir = directory();
        assert!(dir.roles_for_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_login() {
        let dir = directory();
        assert_eq!(dir.find_by_login("alice").await.unwrap().unwrap().id, "alice");
        assert_eq!(
            dir.find_by_login("alice@example.com").await.unwrap().unwrap().id,
            "alice"
        );
        assert!(dir.find_by_login("carol").await.unwrap().is_none());
    }

    #[test]
    fn test_assign_and_revoke_role() {
        let dir = directory();
        assert!(dir.assign_role("bob", "operator"));
        assert!(dir.user("bob").unwrap().roles.contains(&"operator".to_string()));

        assert!(dir.revoke_role("bob", "operator"));
        assert!(!dir.revoke_role("bob", "operator"));
        assert!(!dir.assign_role("nobody", "viewer"));
    }

    #[test]
    fn test_debug_hides_password_hash() {
        let account = UserAccount::new("alice").with_password_hash("$argon2id$secret");
        let debug = format!("{account:?}");
        assert!(!debug.contains("argon2id"));
        assert!(debug.contains("has_password: true"));
    }
}
