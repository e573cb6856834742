//! Route table.

mod admin;
mod challenge;
mod health;
mod submit;
mod verify;

use crate::middleware::{limit_global, limit_submit, limit_verify};
use crate::state::AppState;
use axum::{http::HeaderMap, middleware::from_fn_with_state, routing::get, routing::post, Router};

pub const ADMIN_KEY_HEADER: &str = "x-admin-api-key";
pub const SITE_SECRET_HEADER: &str = "x-site-secret";

/// Build the full application. Unknown paths fall through to axum's 404.
pub fn router(state: AppState) -> Router {
    let verify_routes = Router::new()
        .route("/v1/verify", post(verify::verify))
        .route("/v1/verify-server", post(verify::verify_server))
        .route_layer(from_fn_with_state(state.clone(), limit_verify));

    let submit_routes = Router::new()
        .route("/v1/submit", post(submit::submit))
        .route_layer(from_fn_with_state(state.clone(), limit_submit));

    Router::new()
        .route("/health", get(health::health))
        .route("/v1/challenge", post(challenge::challenge))
        .route("/v1/admin/sites", post(admin::create_site))
        .merge(verify_routes)
        .merge(submit_routes)
        .layer(from_fn_with_state(state.clone(), limit_global))
        .with_state(state)
}

/// Header value as text; absent or non-UTF-8 values read as `None`.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
