// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Credential login, refresh token rotation and logout.

use std::sync::{Arc, OnceLock};

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::{AuthError, AuthResult, Claims, JwtService, SignedToken, UserAccount, UserStore};

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Signing(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::Repository(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// A real hash to verify against when there is no stored one.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("warden-unused-password").ok())
        .as_deref()
}

// =============================================================================
// TokenPair
// =============================================================================

/// An access token and the refresh token that can renew it.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access: SignedToken,
    /// Long-lived refresh token.
    pub refresh: SignedToken,
}

// =============================================================================
// AuthService
// =============================================================================

/// Session operations on top of [`JwtService`] and a [`UserStore`].
#[derive(Clone)]
pub struct AuthService {
    jwt: JwtService,
    users: Arc<dyn UserStore>,
}

impl AuthService {
    /// Creates a new service.
    pub fn new(jwt: JwtService, users: Arc<dyn UserStore>) -> Self {
        Self { jwt, users }
    }

    /// Returns the underlying JWT service.
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Verifies credentials and issues a token pair.
    ///
    /// Unknown users, accounts without a password, disabled accounts and
    /// wrong passwords all fail with [`AuthError::InvalidCredentials`]. Every
    /// attempt runs one Argon2 verification.
    pub async fn login(&self, login: &str, password: &str) -> AuthResult<TokenPair> {
        let account = self.users.find_by_login(login).await?;
        let stored = account.as_ref().and_then(|a| a.password_hash.clone());

        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || match stored {
            Some(hash) => verify_password(&password, &hash),
            None => {
                if let Some(hash) = dummy_hash() {
                    let _ = verify_password(&password, hash);
                }
                Ok(false)
            }
        })
        .await
        .map_err(|e| AuthError::Signing(format!("password verification task failed: {e}")))??;

        let Some(account) = account else {
            tracing::info!(login = %login, "Login failed: unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if account.password_hash.is_none() {
            tracing::info!(user_id = %account.id, "Login failed: account has no password");
            return Err(AuthError::InvalidCredentials);
        }
        if !verified {
            tracing::info!(user_id = %account.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !account.active {
            tracing::info!(user_id = %account.id, "Login failed: account disabled");
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issue_pair(&account)?;
        tracing::info!(
            user_id = %account.id,
            token_id = %pair.access.claims.token_id(),
            "User logged in"
        );
        Ok(pair)
    }

    /// Exchanges a refresh token for a new pair and revokes the old one.
    ///
    /// Roles are re-read from the store, so role changes take effect at the
    /// next refresh.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.jwt.validate_refresh_token(refresh_token)?;

        let account = self
            .users
            .find_by_id(claims.user_id())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !account.active {
            tracing::info!(user_id = %account.id, "Refresh refused: account disabled");
            return Err(AuthError::InvalidCredentials);
        }

        // Two concurrent refreshes with the same token: only one may win.
        if !self.jwt.revoke(&claims) {
            return Err(AuthError::Revoked);
        }

        let pair = self.issue_pair(&account)?;
        tracing::debug!(
            user_id = %account.id,
            old_token_id = %claims.token_id(),
            new_token_id = %pair.refresh.claims.token_id(),
            "Refresh token rotated"
        );
        Ok(pair)
    }

    /// Revokes the caller's access token and, if given, their refresh token.
    ///
    /// The access token is always revoked. A refresh token is revoked only
    /// when it is valid and belongs to the same user; anything else is
    /// skipped without failing the logout.
    pub fn logout(&self, access: &Claims, refresh_token: Option<&str>) {
        self.jwt.revoke(access);
        if let Some(token) = refresh_token {
            match self.jwt.validate_refresh_token(token) {
                Ok(refresh) if refresh.user_id() == access.user_id() => {
                    self.jwt.revoke(&refresh);
                }
                Ok(refresh) => tracing::warn!(
                    user_id = %access.user_id(),
                    other_user_id = %refresh.user_id(),
                    "Logout ignored another user's refresh token"
                ),
                Err(e) => tracing::debug!(error = %e, "Logout skipped unusable refresh token"),
            }
        }
        tracing::info!(user_id = %access.user_id(), "User logged out");
    }

    fn issue_pair(&self, account: &UserAccount) -> AuthResult<TokenPair> {
        let access = self
            .jwt
            .generate_access_token(&account.id, account.email.as_deref(), &account.roles)?;
        let refresh = self.jwt.generate_refresh_token(&account.id)?;
        Ok(TokenPair { access, refresh })
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").field("jwt", &self.jwt).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
