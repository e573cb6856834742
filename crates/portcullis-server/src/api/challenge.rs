use crate::error::ApiResult;
use crate::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeBody {
    site_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    ok: bool,
    challenge_id: String,
    token: String,
    challenge: ChallengeSpec,
}

pub async fn challenge(
    State(state): State<AppState>,
    body: Result<Json<ChallengeBody>, JsonRejection>,
) -> ApiResult<Json<ChallengeResponse>> {
    let Json(body) = body?;
    let issued = state.gateway.challenge(body.site_key.as_deref())?;
    Ok(Json(ChallengeResponse {
        ok: true,
        challenge_id: issued.challenge_id,
        token: issued.token,
        challenge: ChallengeSpec { kind: "micro-ui" },
    }))
}
