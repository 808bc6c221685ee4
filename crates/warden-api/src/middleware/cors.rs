// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CORS layer construction.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};

use crate::config::CorsConfig;

/// Builds the CORS layer from configuration.
///
/// Entries that don't parse as origins, methods or header names are skipped
/// with a warning. When credentials are allowed, wildcards are replaced by
/// mirroring the request, since browsers reject `*` together with
/// credentials.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new().max_age(Duration::from_secs(config.max_age));

    // Origins
    layer = if config.allows_any_origin() {
        if config.allow_credentials {
            layer.allow_origin(AllowOrigin::mirror_request())
        } else {
            layer.allow_origin(Any)
        }
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    };

    // Methods
    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| match m.parse() {
            Ok(method) => Some(method),
            Err(_) => {
                tracing::warn!(method = %m, "Ignoring invalid CORS method");
                None
            }
        })
        .collect();
    layer = layer.allow_methods(methods);

    // Headers
    layer = if config.allowed_headers.iter().any(|h| h == "*") {
        if config.allow_credentials {
            layer.allow_headers(AllowHeaders::mirror_request())
        } else {
            layer.allow_headers(Any)
        }
    } else {
        layer.allow_headers(parse_header_names(&config.allowed_headers))
    };
    layer = layer.expose_headers(parse_header_names(&config.exposed_headers));

    if config.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    layer
}

fn parse_header_names(names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter(|name| name.as_str() != "*")
        .filter_map(|name| match HeaderName::try_from(name.as_str()) {
            Ok(header) => Some(header),
            Err(_) => {
                tracing::warn!(header = %name, "Ignoring invalid CORS header name");
                None
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
