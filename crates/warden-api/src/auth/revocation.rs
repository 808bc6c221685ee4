// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Revoked token tracking.

use chrono::Utc;
use dashmap::DashMap;

/// In-memory set of revoked token IDs.
///
/// Each entry is kept until the token's own expiry, after which the token
/// would be rejected anyway and the entry can be purged.
#[derive(Debug, Default)]
pub struct TokenBlacklist {
    entries: DashMap<String, i64>,
}

impl TokenBlacklist {
    /// Creates an empty blacklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes a token ID until `expires_at` (Unix seconds).
    ///
    /// Returns `false` if the ID was already revoked.
    pub fn revoke(&self, token_id: impl Into<String>, expires_at: i64) -> bool {
        self.entries.insert(token_id.into(), expires_at).is_none()
    }

    /// Returns `true` if the token ID has been revoked.
    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.entries.contains_key(token_id)
    }

    /// Drops entries whose tokens expired before `now` (Unix seconds).
    ///
    /// Returns the number of purged entries.
    pub fn purge_expired(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Drops entries for tokens that have already expired.
    pub fn purge(&self) -> usize {
        self.purge_expired(Utc::now().timestamp())
    }

    /// Returns the number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is revoked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
