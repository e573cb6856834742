use super::{header_str, ADMIN_KEY_HEADER};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use portcullis_core::Site;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct CreateSiteBody {
    name: Option<String>,
    domains: Option<Vec<String>>,
}

/// Public view of a freshly created site. The secret is shown only here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteView {
    id: String,
    name: String,
    domains: Vec<String>,
    site_key: String,
    secret_key: String,
}

impl From<Site> for SiteView {
    fn from(site: Site) -> Self {
        Self {
            id: site.id,
            name: site.name,
            domains: site.domains,
            site_key: site.site_key,
            secret_key: site.secret_key,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSiteResponse {
    ok: bool,
    site: SiteView,
}

/// Register a tenant. The admin key is checked before body validation; a
/// malformed body from an authorized caller reads as a missing name.
pub async fn create_site(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateSiteBody>, JsonRejection>,
) -> ApiResult<Json<CreateSiteResponse>> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "site registration body rejected");
            CreateSiteBody::default()
        }
    };
    let site = state
        .gateway
        .create_site(
            header_str(&headers, ADMIN_KEY_HEADER),
            body.name.as_deref(),
            body.domains.unwrap_or_default(),
        )
        .await?;
    Ok(Json(CreateSiteResponse {
        ok: true,
        site: site.into(),
    }))
}
