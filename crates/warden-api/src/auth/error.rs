// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication errors.

use thiserror::Error;

use super::TokenType;

/// Result type alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while issuing, validating or revoking credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The token's `exp` is in the past.
    #[error("Token has expired")]
    Expired,

    /// The signature does not verify, or was produced with another algorithm.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The token is not a well-formed JWT or lacks required claims.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The token was issued by someone else.
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// An access token was presented where a refresh token is required, or
    /// the other way around.
    #[error("Expected {expected} token, got {actual} token")]
    WrongTokenType {
        /// Required token type.
        expected: TokenType,
        /// Presented token type.
        actual: TokenType,
    },

    /// The token id is on the revocation list.
    #[error("Token has been revoked")]
    Revoked,

    /// The claim set violates an invariant (for example `exp <= iat`).
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    /// Login failed. Unknown users and wrong passwords are indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Key material could not be loaded or parsed.
    #[error("Key error: {0}")]
    Key(String),

    /// Signing or hashing failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// The role or user repository failed.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Returns `true` if the failure was caused by the presented credentials
    /// rather than by the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::Key(_) | AuthError::Signing(_) | AuthError::Repository(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                AuthError::InvalidSignature
            }
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::InvalidRsaKey(msg) => AuthError::Key(msg.clone()),
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidEcdsaKey => {
                AuthError::Key(err.to_string())
            }
            ErrorKind::InvalidToken => AuthError::Malformed("invalid token structure".to_string()),
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::Malformed(format!("missing required claim '{claim}'"))
            }
            ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::Malformed(err.to_string())
            }
            _ => AuthError::Malformed(err.to_string()),
        }
    }
}
