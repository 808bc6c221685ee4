// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Probes. Both routes are public by default.

use axum::{Json, extract::State};

use crate::response::{HealthResponse, LimiterStatus, ReadinessResponse, SigningStatus};
use crate::state::AppState;

/// `GET /health`: the process is up.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// `GET /ready`: a snapshot of the token, permission and limiter state.
///
/// All of it lives in process memory, so a server that answers is ready.
pub async fn ready(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let limit = &state.config.rate_limit;
    let rate_limit = limit.enabled.then(|| LimiterStatus {
        max_requests: limit.max_requests,
        window_secs: limit.window_secs,
        tracked_keys: state.limiter().len(),
    });

    Json(ReadinessResponse {
        ready: true,
        signing: SigningStatus {
            algorithm: format!("{:?}", state.jwt().algorithm()),
            issuer: state.jwt().issuer().to_string(),
        },
        revoked_tokens: state.jwt().revoked_count(),
        cached_users: state.permissions().cached_users(),
        rate_limit,
    })
}
