// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Sliding-window rate limiting.
//!
//! Every key owns a log of admission timestamps. A check first drops the
//! timestamps that fell out of the window, then admits the request if fewer
//! than `limit` remain. Checks on the same key are serialized by the map
//! shard lock, so check-and-record is atomic within the process.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

// =============================================================================
// Clock
// =============================================================================

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

// =============================================================================
// RateLimitKey
// =============================================================================

/// What a rate limit key identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// An authenticated user ID.
    User,
    /// A client IP address.
    Ip,
}

impl KeyKind {
    /// Returns the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::User => "user",
            KeyKind::Ip => "ip",
        }
    }
}

impl FromStr for KeyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(KeyKind::User),
            "ip" => Ok(KeyKind::Ip),
            other => Err(format!("unknown rate limit key kind '{other}'")),
        }
    }
}

/// Identity under which requests are counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitKey {
    /// User ID or IP address.
    pub identifier: String,
    /// Key kind.
    pub kind: KeyKind,
}

impl RateLimitKey {
    /// Creates a key for an authenticated user.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            identifier: user_id.into(),
            kind: KeyKind::User,
        }
    }

    /// Creates a key for a client address.
    pub fn ip(ip: impl ToString) -> Self {
        Self {
            identifier: ip.to_string(),
            kind: KeyKind::Ip,
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.identifier)
    }
}

// =============================================================================
// RateLimitDecision
// =============================================================================

/// Outcome of a single admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request was admitted (and recorded).
    pub allowed: bool,
    /// The limit that was applied.
    pub limit: u32,
    /// Admissions left in the current window after this check.
    pub remaining: u32,
    /// When the oldest counted request leaves the window.
    pub reset_at: DateTime<Utc>,
    /// Whole seconds to wait before retrying; set only when denied.
    pub retry_after: Option<u64>,
}

impl RateLimitDecision {
    /// Returns `reset_at` as Unix seconds.
    pub fn reset_epoch_secs(&self) -> i64 {
        self.reset_at.timestamp()
    }
}

// =============================================================================
// RateLimiter
// =============================================================================

/// In-process sliding-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<RateLimitKey, VecDeque<i64>>,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Creates a limiter driven by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a limiter driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            clock,
        }
    }

    /// Admits or denies a request, recording it when admitted.
    pub fn allow_request(&self, key: &RateLimitKey, limit: u32, window: Duration) -> bool {
        self.check(key, limit, window).allowed
    }

    /// Admits or denies a request and reports the window state.
    pub fn check(&self, key: &RateLimitKey, limit: u32, window: Duration) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let window_ms = window_millis(window);

        let mut entries = self.windows.entry(key.clone()).or_default();
        prune(&mut entries, now, window_ms);

        let allowed = (entries.len() as u64) < u64::from(limit);
        if allowed {
            entries.push_back(now);
        }

        let reset_ms = reset_millis(&entries, now, window_ms);
        let retry_after = (!allowed).then(|| {
            let wait_ms = if entries.is_empty() {
                window_ms
            } else {
                reset_ms - now
            };
            ceil_secs(wait_ms).max(1)
        });

        RateLimitDecision {
            allowed,
            limit,
            remaining: remaining(limit, entries.len()),
            reset_at: to_datetime(reset_ms),
            retry_after,
        }
    }

    /// Returns how many more requests the key may make in the window.
    pub fn remaining_attempts(&self, key: &RateLimitKey, limit: u32, window: Duration) -> u32 {
        let now = self.clock.now_millis();
        match self.windows.get_mut(key) {
            Some(mut entries) => {
                prune(&mut entries, now, window_millis(window));
                remaining(limit, entries.len())
            }
            None => limit,
        }
    }

    /// Returns when the earliest counted request leaves the window, or now
    /// if nothing is counted.
    pub fn reset_time(&self, key: &RateLimitKey, window: Duration) -> DateTime<Utc> {
        let now = self.clock.now_millis();
        let window_ms = window_millis(window);
        let reset_ms = match self.windows.get_mut(key) {
            Some(mut entries) => {
                prune(&mut entries, now, window_ms);
                reset_millis(&entries, now, window_ms)
            }
            None => now,
        };
        to_datetime(reset_ms)
    }

    /// Forgets everything recorded for a key.
    pub fn reset(&self, key: &RateLimitKey) -> bool {
        self.windows.remove(key).is_some()
    }

    /// Removes keys with no timestamps inside `max_window`.
    ///
    /// Returns the number of removed keys.
    pub fn sweep(&self, max_window: Duration) -> usize {
        let cutoff = self.clock.now_millis() - window_millis(max_window);
        let before = self.windows.len();
        self.windows
            .retain(|_, entries| entries.back().is_some_and(|&newest| newest > cutoff));
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.windows.len(), "Swept idle rate limit keys");
        }
        removed
    }

    /// Drops all state.
    pub fn clear(&self) {
        self.windows.clear();
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns `true` if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Returns the limiter's current time.
    pub fn now(&self) -> DateTime<Utc> {
        to_datetime(self.clock.now_millis())
    }
}

fn window_millis(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}

fn prune(entries: &mut VecDeque<i64>, now: i64, window_ms: i64) {
    let cutoff = now.saturating_sub(window_ms);
    while entries.front().is_some_and(|&ts| ts <= cutoff) {
        entries.pop_front();
    }
}

fn reset_millis(entries: &VecDeque<i64>, now: i64, window_ms: i64) -> i64 {
    entries
        .front()
        .map_or(now, |&oldest| oldest.saturating_add(window_ms))
}

fn remaining(limit: u32, used: usize) -> u32 {
    limit.saturating_sub(u32::try_from(used).unwrap_or(u32::MAX))
}

fn ceil_secs(millis: i64) -> u64 {
    (millis.max(0) as u64).div_ceil(1000)
}

fn to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
