use super::header_str;
use crate::error::ApiResult;
use crate::middleware::ClientIp;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    Json,
};
use portcullis_core::{RequestMeta, SubmitRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    site_key: Option<String>,
    token: Option<String>,
    access_token: Option<String>,
    payload: Option<Value>,
    honeypot: Option<String>,
    fingerprint: Option<String>,
}

impl From<SubmitBody> for SubmitRequest {
    fn from(body: SubmitBody) -> Self {
        SubmitRequest {
            site_key: body.site_key,
            token: body.token,
            access_token: body.access_token,
            payload: body.payload,
            honeypot: body.honeypot,
            fingerprint: body.fingerprint,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    ok: bool,
    event_id: String,
}

pub async fn submit(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Result<Json<SubmitBody>, JsonRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let Json(body) = body?;
    let meta = RequestMeta {
        ip: Some(ip),
        user_agent: header_str(&headers, header::USER_AGENT.as_str()).map(str::to_string),
        origin: header_str(&headers, header::ORIGIN.as_str()).map(str::to_string),
    };
    let event_id = state.gateway.submit(body.into(), meta).await?;
    Ok(Json(SubmitResponse { ok: true, event_id }))
}
