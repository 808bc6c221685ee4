// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Response assertions with failure messages that include the body.

use axum::http::StatusCode;
use warden_api::ErrorResponseBody;

use super::harness::TestResponse;

/// Assertion extensions for [`TestResponse`].
pub trait ResponseAssertions {
    /// Assert the status code.
    fn assert_status(&self, expected: StatusCode) -> &Self;

    /// Assert that a header is present with the given value.
    fn assert_header(&self, name: &str, expected: &str) -> &Self;

    /// Assert that a header is present.
    fn assert_has_header(&self, name: &str) -> &Self;

    /// Assert the status and the `error` code of a JSON error body.
    fn assert_error(&self, status: StatusCode, code: &str) -> ErrorResponseBody;
}

impl ResponseAssertions for TestResponse {
    fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "unexpected status, body: {}",
            self.text()
        );
        self
    }

    fn assert_header(&self, name: &str, expected: &str) -> &Self {
        assert_eq!(
            self.header(name),
            Some(expected),
            "header '{name}' mismatch, headers: {:?}",
            self.headers
        );
        self
    }

    fn assert_has_header(&self, name: &str) -> &Self {
        assert!(
            self.headers.contains_key(name),
            "missing header '{name}', headers: {:?}",
            self.headers
        );
        self
    }

    fn assert_error(&self, status: StatusCode, code: &str) -> ErrorResponseBody {
        self.assert_status(status);
        let body: ErrorResponseBody = self.json();
        assert_eq!(body.error, code, "unexpected error code: {}", body.message);
        body
    }
}
