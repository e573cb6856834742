use super::{header_str, SITE_SECRET_HEADER};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBody {
    site_key: Option<String>,
    token: Option<String>,
    secret_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    ok: bool,
    score: f64,
    reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Browser widget exchanging a challenge token for an access token.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<VerifyBody>, JsonRejection>,
) -> ApiResult<Json<VerifyResponse>> {
    let Json(body) = body?;
    let outcome = state
        .gateway
        .verify(
            body.site_key.as_deref(),
            body.token.as_deref(),
            header_str(&headers, header::ORIGIN.as_str()),
        )
        .await?;
    Ok(Json(VerifyResponse {
        ok: true,
        score: outcome.assessment.score,
        reason: outcome.assessment.reason,
        access_token: Some(outcome.access_token),
    }))
}

/// Site backend confirming a token with its secret key.
///
/// The secret may arrive in the body (`secretKey`) or the `x-site-secret`
/// header; the body wins when both are present.
pub async fn verify_server(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<VerifyBody>, JsonRejection>,
) -> ApiResult<Json<VerifyResponse>> {
    let Json(body) = body?;
    let secret = body
        .secret_key
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| header_str(&headers, SITE_SECRET_HEADER));
    let assessment = state
        .gateway
        .verify_server(body.site_key.as_deref(), body.token.as_deref(), secret)
        .await?;
    Ok(Json(VerifyResponse {
        ok: true,
        score: assessment.score,
        reason: assessment.reason,
        access_token: None,
    }))
}
