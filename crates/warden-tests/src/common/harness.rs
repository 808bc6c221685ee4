// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! [`TestGateway`] builds the production router around the fixture
//! directory and drives it with `tower::ServiceExt::oneshot`. Every request
//! carries a `ConnectInfo` peer address so IP-keyed rate limiting works as
//! it does behind a real listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use warden_api::auth::InMemoryDirectory;
use warden_api::response::TokenPairResponse;
use warden_api::{ApiConfig, ApiServer, ApiServerBuilder, AppState};

use super::fixtures::{AccessFixtures, ConfigFixtures};

/// Default peer address for requests.
pub const DEFAULT_PEER: &str = "203.0.113.7:41000";

// =============================================================================
// TestGateway
// =============================================================================

/// An in-process gateway.
pub struct TestGateway {
    server: ApiServer,
    router: Router,
    directory: Arc<InMemoryDirectory>,
    peer: SocketAddr,
}

impl TestGateway {
    /// Gateway with the fixture config and directory.
    pub fn new() -> Self {
        Self::with_config(ConfigFixtures::api_config())
    }

    /// Gateway with a custom config and the fixture directory.
    pub fn with_config(config: ApiConfig) -> Self {
        Self::with_directory(config, AccessFixtures::directory())
    }

    /// Gateway with a custom config and directory.
    pub fn with_directory(config: ApiConfig, directory: InMemoryDirectory) -> Self {
        super::init_test_logging();

        let directory = Arc::new(directory);
        let server = ApiServerBuilder::new()
            .config(config)
            .directory(directory.clone())
            .build()
            .expect("Failed to build server");
        let router = server.router().expect("Failed to build router");

        Self {
            server,
            router,
            directory,
            peer: DEFAULT_PEER.parse().expect("valid peer address"),
        }
    }

    /// Sends subsequent requests from another peer address.
    pub fn from_peer(mut self, peer: &str) -> Self {
        self.peer = peer.parse().expect("valid peer address");
        self
    }

    /// Shared application state.
    pub fn state(&self) -> &AppState {
        self.server.state()
    }

    /// The fixture directory backing this gateway.
    pub fn directory(&self) -> &InMemoryDirectory {
        &self.directory
    }

    /// Mints an access token for a fixture user, bypassing login.
    pub fn access_token(&self, user_id: &str) -> String {
        let account = self
            .directory
            .user(user_id)
            .unwrap_or_else(|| panic!("unknown fixture user '{user_id}'"));
        self.state()
            .jwt()
            .generate_access_token(&account.id, account.email.as_deref(), &account.roles)
            .expect("Failed to sign token")
            .token
    }

    /// Sends a request through the full middleware stack.
    pub async fn send(&self, mut request: Request<Body>) -> TestResponse {
        if request.extensions().get::<ConnectInfo<SocketAddr>>().is_none() {
            request.extensions_mut().insert(ConnectInfo(self.peer));
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a GET request, optionally with a bearer token.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token, Body::empty()))
            .await
    }

    /// Sends a POST request with a JSON body.
    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> TestResponse {
        let mut req = request(Method::POST, uri, token, Body::from(body.to_string()));
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            "application/json".parse().expect("valid header"),
        );
        self.send(req).await
    }

    /// Logs in and returns the issued pair. Panics unless the login succeeds.
    pub async fn login(&self, login: &str, password: &str) -> TokenPairResponse {
        let response = self
            .post_json(
                "/api/v1/auth/login",
                None,
                serde_json::json!({ "login": login, "password": password }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "login failed: {}",
            response.text()
        );
        response.json()
    }
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a request with an optional bearer token.
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body).expect("valid request")
}

// =============================================================================
// TestResponse
// =============================================================================

/// A fully buffered response.
#[derive(Debug)]
pub struct TestResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl TestResponse {
    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("invalid JSON body ({e}): {}", self.text()))
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// A header value as a string, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
