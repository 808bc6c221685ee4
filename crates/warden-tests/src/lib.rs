// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Warden Integration Tests
//!
//! End-to-end tests that drive the full axum router, middleware stack
//! included, without opening a socket.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Keys, roles, users and configurations
//!   - `harness`: [`TestGateway`](common::harness::TestGateway), an in-process gateway
//!   - `assertions`: Response assertion helpers
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p warden-tests
//! cargo test -p warden-tests --test integration_middleware
//! ```
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use warden_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let gateway = TestGateway::new();
//!     let token = gateway.access_token("alice");
//!     let response = gateway.get("/api/v1/auth/me", Some(&token)).await;
//!     response.assert_status(StatusCode::OK);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use axum::http::StatusCode;
}
