// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Handler arguments that reject with [`ApiError`] instead of axum's
//! plain-text rejections.

use std::net::{IpAddr, SocketAddr};

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, FromRequest, FromRequestParts},
    http::{Extensions, HeaderMap, Request, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::auth::AuthContext;
use crate::error::ApiError;

/// The caller established by the auth middleware.
///
/// Only reachable behind `AuthLayer`; a public route taking `Auth` answers
/// 401.
///
/// ```rust,ignore
/// async fn me(Auth(ctx): Auth) -> String {
///     ctx.user_id
/// }
/// ```
pub struct Auth(pub AuthContext);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthContext>() {
            Some(ctx) => Ok(Self(ctx.clone())),
            None => Err(ApiError::unauthorized("Authentication required")),
        }
    }
}

/// A JSON body. Syntax and shape errors become 400 `BAD_REQUEST`.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| {
                ApiError::bad_request(format!("Invalid JSON: {}", rejection.body_text()))
            })
    }
}

/// The TCP peer's address, when the server was started with connect info.
pub struct ClientIp(pub Option<IpAddr>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(peer_ip(&parts.extensions)))
    }
}

/// Picks the address a request is attributed to.
///
/// Proxy headers are read only when `trust_forwarded` is set: the leftmost
/// parseable `X-Forwarded-For` hop, else `X-Real-IP`. The TCP peer is the
/// fallback either way.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded: bool,
) -> Option<IpAddr> {
    let proxied = || forwarded_for(headers).or_else(|| real_ip(headers));
    trust_forwarded
        .then(proxied)
        .flatten()
        .or_else(|| peer_ip(extensions))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let first_hop = header_str(headers, "x-forwarded-for")?.split(',').next()?;
    first_hop.trim().parse().ok()
}

fn real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, "x-real-ip")?.trim().parse().ok()
}

fn peer_ip(extensions: &Extensions) -> Option<IpAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
