//! Layered per-address rate limiting.
//!
//! The global limiter wraps every route. The verify and submit limiters are
//! attached with `route_layer` to their own routes, so a request to
//! `/v1/submit` counts against both the global and the submit window.
//! Rejected requests still count.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, Extensions, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use portcullis_core::FixedWindowLimiter;
use std::net::SocketAddr;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

/// Address a request is attributed to, for limiting and for submission records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn resolve(headers: &HeaderMap, extensions: &Extensions, trust_forwarded_for: bool) -> Self {
        if trust_forwarded_for {
            let forwarded = headers
                .get(FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return Self(ip.to_string());
            }
        }
        match extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => Self(addr.ip().to_string()),
            None => Self(UNKNOWN_CLIENT.to_string()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(ip) = parts.extensions.get::<ClientIp>() {
            return Ok(ip.clone());
        }
        Ok(Self::resolve(
            &parts.headers,
            &parts.extensions,
            state.trust_forwarded_for,
        ))
    }
}

async fn enforce(
    limiter: &FixedWindowLimiter,
    trust_forwarded_for: bool,
    mut request: Request,
    next: Next,
) -> Response {
    let client = match request.extensions().get::<ClientIp>() {
        Some(ip) => ip.clone(),
        None => {
            let ip = ClientIp::resolve(request.headers(), request.extensions(), trust_forwarded_for);
            request.extensions_mut().insert(ip.clone());
            ip
        }
    };

    if let Err(err) = limiter.check(&client.0) {
        tracing::warn!(
            limiter = limiter.name(),
            client_ip = %client.0,
            path = %request.uri().path(),
            "rate limit exceeded"
        );
        return ApiError::from(err).into_response();
    }
    next.run(request).await
}

pub async fn limit_global(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(&state.limiters.global, state.trust_forwarded_for, request, next).await
}

pub async fn limit_verify(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(&state.limiters.verify, state.trust_forwarded_for, request, next).await
}

pub async fn limit_submit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    enforce(&state.limiters.submit, state.trust_forwarded_for, request, next).await
}
