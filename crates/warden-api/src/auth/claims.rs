// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JWT claims structure.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthError, AuthResult};

// =============================================================================
// TokenType
// =============================================================================

/// Distinguishes short-lived access tokens from long-lived refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Presented on every request.
    Access,
    /// Exchanged for a new access token.
    Refresh,
}

impl TokenType {
    /// Returns the wire name of the token type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Claims
// =============================================================================

/// JWT claims for authentication.
///
/// Claims are immutable once built; `exp` is always strictly after `iat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    // =========================================================================
    // Standard JWT Claims (RFC 7519)
    // =========================================================================
    sub: String,
    iat: i64,
    exp: i64,
    iss: String,
    jti: String,

    // =========================================================================
    // Custom Claims
    // =========================================================================
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(rename = "type")]
    token_type: TokenType,
}

impl Claims {
    /// Creates claims for a user valid between `issued_at` and `expires_at`.
    ///
    /// Fails with [`AuthError::InvalidClaims`] unless `expires_at > issued_at`.
    pub fn new(
        user_id: impl Into<String>,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<Self> {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(AuthError::InvalidClaims("subject must not be empty".to_string()));
        }

        let claims = Self {
            sub: user_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: String::new(),
            jti: Uuid::now_v7().to_string(),
            email: None,
            roles: Vec::new(),
            token_type,
        };
        claims.check_lifetime()?;
        Ok(claims)
    }

    /// Creates claims issued now with the given lifetime.
    pub fn issue(
        user_id: impl Into<String>,
        token_type: TokenType,
        ttl: Duration,
    ) -> AuthResult<Self> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AuthError::InvalidClaims(format!("token lifetime out of range: {e}")))?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::InvalidClaims("token expiry is out of range".to_string()))?;
        Self::new(user_id, token_type, now, expires_at)
    }

    /// Sets the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
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

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = issuer.into();
        self
    }

    /// Verifies `exp > iat`. Called again on every decoded token.
    pub(crate) fn check_lifetime(&self) -> AuthResult<()> {
        if self.exp <= self.iat {
            return Err(AuthError::InvalidClaims(
                "expiration must be after issued-at".to_string(),
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the user ID.
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Returns the email, if any.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the roles.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns `true` if the claims have the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns the issuer.
    pub fn issuer(&self) -> &str {
        &self.iss
    }

    /// Returns the unique token ID.
    pub fn token_id(&self) -> &str {
        &self.jti
    }

    /// Returns the token type.
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// Returns the issued-at time as a Unix timestamp.
    pub fn iat(&self) -> i64 {
        self.iat
    }

    /// Returns the expiration time as a Unix timestamp.
    pub fn exp(&self) -> i64 {
        self.exp
    }

    /// Returns the issued-at time.
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    /// Returns the expiration time.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Returns `true` if the token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Returns the time remaining until expiration.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        (self.exp > now).then(|| Duration::from_secs((self.exp - now) as u64))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let now = Utc::now();
        let claims = Claims::new("user123", TokenType::Access, now, now + chrono::Duration::minutes(15))
            .unwrap()
            .with_email("user@example.com")
            .with_roles(["admin", "operator"])
            .with_issuer("warden");

        assert_eq!(claims.user_id(), "user123");
        assert_eq!(claims.email(), Some("user@example.com"));
        assert!(claims.has_role("admin"));
        assert!(!claims.has_role("viewer"));
        assert_eq!(claims.issuer(), "warden");
        assert_eq!(claims.token_type(), TokenType::Access);
        assert!(!claims.is_expired());
        assert_eq!(claims.exp() - claims.iat(), 900);
    }

    #[test]
    fn test_expiry_must_follow_issue() {
        let now = Utc::now();
        let result = Claims::new("user", TokenType::Access, now, now);
        assert!(matches!(result, Err(AuthError::InvalidClaims(_))));

        let result = Claims::new("user", TokenType::Access, now, now - chrono::Duration::seconds(1));
        assert!(matches!(result, Err(AuthError::InvalidClaims(_))));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let result = Claims::issue("", TokenType::Refresh, Duration::from_secs(60));
        assert!(matches!(result, Err(AuthError::InvalidClaims(_))));
    }

    #[test]
    fn test_unrepresentable_expiry_rejected() {
        let result = Claims::issue("user", TokenType::Access, Duration::from_secs(10_000_000_000_000));
        assert!(matches!(result, Err(AuthError::InvalidClaims(_))));
    }

    #[test]
    fn test_token_ids_are_unique() {
        let a = Claims::issue("user", TokenType::Access, Duration::from_secs(60)).unwrap();
        let b = Claims::issue("user", TokenType::Access, Duration::from_secs(60)).unwrap();
        assert_ne!(a.token_id(), b.token_id());
    }

    #[test]
    fn test_serialized_shape() {
        let claims = Claims::issue("user", TokenType::Refresh, Duration::from_secs(60))
            .unwrap()
            .with_issuer("warden");
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["sub"], "user");
        assert_eq!(json["type"], "refresh");
        assert_eq!(json["iss"], "warden");
        assert!(json.get("email").is_none());
        assert!(json["jti"].is_string());
    }
}
