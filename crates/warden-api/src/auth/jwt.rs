// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JWT token management.
//!
//! Tokens are signed with RS256 by default. Access tokens live for 15 minutes
//! and refresh tokens for 7 days unless configured otherwise.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthResult, Claims, TokenBlacklist, TokenType};

/// Default access token lifetime (15 minutes).
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;

/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted token lifetime (one year).
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

// =============================================================================
// JwtConfig
// =============================================================================

/// JWT configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Algorithm to use for signing.
    pub algorithm: Algorithm,
    /// Path to the PEM-encoded RSA private key.
    pub private_key_path: Option<PathBuf>,
    /// Path to the PEM-encoded RSA public key.
    pub public_key_path: Option<PathBuf>,
    /// Inline PEM private key. Takes precedence over `private_key_path`.
    #[serde(skip_serializing)]
    pub private_key_pem: Option<String>,
    /// Inline PEM public key. Takes precedence over `public_key_path`.
    #[serde(skip_serializing)]
    pub public_key_pem: Option<String>,
    /// Shared secret for HMAC algorithms.
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    /// Token issuer.
    pub issuer: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: u64,
    /// Clock skew tolerance in seconds.
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::RS256,
            private_key_path: None,
            public_key_path: None,
            private_key_pem: None,
            public_key_pem: None,
            secret: None,
            issuer: "warden".to_string(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            leeway_secs: 0,
        }
    }
}

impl JwtConfig {
    /// Creates an RS256 configuration from inline PEM keys.
    pub fn rs256(private_key_pem: impl Into<String>, public_key_pem: impl Into<String>) -> Self {
        Self {
            private_key_pem: Some(private_key_pem.into()),
            public_key_pem: Some(public_key_pem.into()),
            ..Default::default()
        }
    }

    /// Creates an RS256 configuration reading keys from disk.
    pub fn rs256_files(private_key_path: impl Into<PathBuf>, public_key_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: Some(private_key_path.into()),
            public_key_path: Some(public_key_path.into()),
            ..Default::default()
        }
    }

    /// Creates an HS256 configuration with a shared secret.
    pub fn hs256(secret: impl Into<String>) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            secret: Some(secret.into()),
            ..Default::default()
        }
    }

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets the access token lifetime.
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl_secs = ttl.as_secs();
        self
    }

    /// Sets the refresh token lifetime.
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl_secs = ttl.as_secs();
        self
    }

    /// Sets the clock skew tolerance.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway_secs = leeway.as_secs();
        self
    }

    /// Returns `true` if the algorithm uses a shared secret.
    pub fn is_hmac(&self) -> bool {
        matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        )
    }

    /// Returns `true` if the algorithm uses an RSA key pair.
    pub fn is_rsa(&self) -> bool {
        matches!(
            self.algorithm,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        )
    }

    /// Resolves relative key paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.private_key_path, &mut self.public_key_path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AuthResult<()> {
        if self.issuer.trim().is_empty() {
            return Err(AuthError::Key("JWT issuer must not be empty".to_string()));
        }
        if self.access_ttl_secs == 0 || self.refresh_ttl_secs == 0 {
            return Err(AuthError::Key("token lifetimes must be positive".to_string()));
        }
        if self.access_ttl_secs > MAX_TTL_SECS || self.refresh_ttl_secs > MAX_TTL_SECS {
            return Err(AuthError::Key(format!(
                "token lifetimes must not exceed {MAX_TTL_SECS} seconds"
            )));
        }

        if self.is_hmac() {
            match self.secret.as_deref() {
                None | Some("") => {
                    return Err(AuthError::Key(format!(
                        "{:?} requires a shared secret",
                        self.algorithm
                    )));
                }
                Some(secret) if secret.len() < 32 => {
                    tracing::warn!("JWT secret is shorter than recommended (32 bytes)");
                }
                Some(_) => {}
            }
            return Ok(());
        }

        if !self.is_rsa() {
            return Err(AuthError::Key(format!(
                "unsupported signing algorithm {:?}",
                self.algorithm
            )));
        }
        if self.private_key_pem.is_none() && self.private_key_path.is_none() {
            return Err(AuthError::Key("RSA private key is not configured".to_string()));
        }
        if self.public_key_pem.is_none() && self.public_key_path.is_none() {
            return Err(AuthError::Key("RSA public key is not configured".to_string()));
        }
        Ok(())
    }

    fn load_pem(inline: &Option<String>, path: &Option<PathBuf>, what: &str) -> AuthResult<String> {
        if let Some(pem) = inline {
            return Ok(pem.clone());
        }
        let path = path
            .as_ref()
            .ok_or_else(|| AuthError::Key(format!("{what} key is not configured")))?;
        std::fs::read_to_string(path)
            .map_err(|e| AuthError::Key(format!("failed to read {what} key {}: {e}", path.display())))
    }

    fn build_keys(&self) -> AuthResult<(EncodingKey, DecodingKey)> {
        if self.is_hmac() {
            let secret = self.secret.as_deref().unwrap_or_default().as_bytes();
            return Ok((EncodingKey::from_secret(secret), DecodingKey::from_secret(secret)));
        }

        let private_pem = Self::load_pem(&self.private_key_pem, &self.private_key_path, "private")?;
        let public_pem = Self::load_pem(&self.public_key_pem, &self.public_key_path, "public")?;

        let encoding = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| AuthError::Key(format!("invalid RSA private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::Key(format!("invalid RSA public key: {e}")))?;
        Ok((encoding, decoding))
    }
}

// =============================================================================
// SignedToken
// =============================================================================

/// An encoded token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// The compact JWS string.
    pub token: String,
    /// The claims that were signed.
    pub claims: Claims,
}

impl SignedToken {
    /// Returns the lifetime of the token in seconds.
    pub fn expires_in(&self) -> i64 {
        self.claims.exp() - self.claims.iat()
    }
}

// =============================================================================
// JwtService
// =============================================================================

/// Issues, validates, refreshes and revokes JWTs.
///
/// Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct JwtService {
    config: Arc<JwtConfig>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    blacklist: Arc<TokenBlacklist>,
}

impl JwtService {
    /// Creates a new service, loading key material eagerly.
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        config.validate()?;
        let (encoding_key, decoding_key) = config.build_keys()?;

        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        validation.validate_aud = false;
        validation.leeway = config.leeway_secs;

        tracing::debug!(
            algorithm = ?config.algorithm,
            issuer = %config.issuer,
            access_ttl_secs = config.access_ttl_secs,
            refresh_ttl_secs = config.refresh_ttl_secs,
            "JWT service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
            blacklist: Arc::new(TokenBlacklist::new()),
        })
    }

    // =========================================================================
    // Issuance
    // =========================================================================

    /// Signs explicit claims.
    pub fn sign(&self, claims: &Claims) -> AuthResult<String> {
        let header = Header::new(self.config.algorithm);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(format!("failed to sign token: {e}")))
    }

    /// Creates an access token for a user.
    pub fn generate_access_token(
        &self,
        user_id: &str,
        email: Option<&str>,
        roles: &[String],
    ) -> AuthResult<SignedToken> {
        let mut claims = Claims::issue(user_id, TokenType::Access, self.access_ttl())?
            .with_roles(roles.iter().cloned())
            .with_issuer(&self.config.issuer);
        if let Some(email) = email {
            claims = claims.with_email(email);
        }

        let token = self.sign(&claims)?;
        Ok(SignedToken { token, claims })
    }

    /// Creates a refresh token for a user.
    pub fn generate_refresh_token(&self, user_id: &str) -> AuthResult<SignedToken> {
        let claims = Claims::issue(user_id, TokenType::Refresh, self.refresh_ttl())?
            .with_issuer(&self.config.issuer);
        let token = self.sign(&claims)?;
        Ok(SignedToken { token, claims })
    }

    /// Exchanges a refresh token for a new access token for the same subject.
    pub fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<SignedToken> {
        let refresh = self.validate_refresh_token(refresh_token)?;
        self.generate_access_token(refresh.user_id(), None, &[])
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validates signature, expiry and issuer, and decodes the claims.
    ///
    /// Does not check the token type or the revocation list.
    pub fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        data.claims
            .check_lifetime()
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        Ok(data.claims)
    }

    /// Validates an access token that has not been revoked.
    pub fn validate_access_token(&self, token: &str) -> AuthResult<Claims> {
        self.validate_typed(token, TokenType::Access)
    }

    /// Validates a refresh token that has not been revoked.
    pub fn validate_refresh_token(&self, token: &str) -> AuthResult<Claims> {
        self.validate_typed(token, TokenType::Refresh)
    }

    fn validate_typed(&self, token: &str, expected: TokenType) -> AuthResult<Claims> {
        let claims = self.validate_token(token)?;
        if claims.token_type() != expected {
            return Err(AuthError::WrongTokenType {
                expected,
                actual: claims.token_type(),
            });
        }
        if self.blacklist.is_revoked(claims.token_id()) {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    // =========================================================================
    // Revocation
    // =========================================================================

    /// Revokes a token until its natural expiry.
    ///
    /// Returns `false` if the token was already revoked.
    pub fn revoke(&self, claims: &Claims) -> bool {
        tracing::debug!(
            user_id = %claims.user_id(),
            token_id = %claims.token_id(),
            token_type = %claims.token_type(),
            "Token revoked"
        );
        self.blacklist.revoke(claims.token_id(), claims.exp())
    }

    /// Returns `true` if the token ID has been revoked.
    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.blacklist.is_revoked(token_id)
    }

    /// Forgets revocations for tokens that have expired anyway.
    pub fn purge_revoked(&self) -> usize {
        self.blacklist.purge()
    }

    /// Returns the number of tracked revocations.
    pub fn revoked_count(&self) -> usize {
        self.blacklist.len()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.config.access_ttl_secs)
    }

    /// Returns the refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.config.refresh_ttl_secs)
    }

    /// Returns the configured issuer.
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }

    /// Returns the signing algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("algorithm", &self.config.algorithm)
            .field("access_ttl_secs", &self.config.access_ttl_secs)
            .field("refresh_ttl_secs", &self.config.refresh_ttl_secs)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
