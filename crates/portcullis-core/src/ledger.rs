//! Submission admission and recording.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. required fields (`siteKey`, a token, a payload)
//! 2. honeypot empty
//! 3. origin policy, when the site is known
//! 4. token redemption
//! 5. persist the event
//!
//! A failed write in step 5 rolls back the consumption recorded in step 4, so
//! the client can retry with the same credential.
//!
//! An unknown site key skips step 3; the token check still binds the
//! submission to whichever site key issued it.

use crate::error::{GateError, GateResult};
use crate::ids;
use crate::model::{RequestMeta, Submission};
use crate::origin::OriginGuard;
use crate::registry::SiteRegistry;
use crate::store::Persistence;
use crate::tokens::{SubmitCredential, TokenService};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Caller-supplied submission fields, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitRequest {
    pub site_key: Option<String>,
    pub token: Option<String>,
    pub access_token: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub honeypot: Option<String>,
    pub fingerprint: Option<String>,
}

/// Present and not blank. The value itself is passed through untrimmed.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl SubmitRequest {
    /// An access token wins when both credentials are present.
    fn credential(&self) -> Option<SubmitCredential> {
        if let Some(access) = non_empty(&self.access_token) {
            return Some(SubmitCredential::Access(access.to_string()));
        }
        non_empty(&self.token).map(|t| SubmitCredential::Challenge(t.to_string()))
    }
}

pub struct SubmissionLedger {
    store: Arc<dyn Persistence>,
    registry: Arc<SiteRegistry>,
    tokens: Arc<TokenService>,
    origin_guard: OriginGuard,
}

impl SubmissionLedger {
    pub fn new(
        store: Arc<dyn Persistence>,
        registry: Arc<SiteRegistry>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            registry,
            tokens,
            origin_guard: OriginGuard,
        }
    }

    pub async fn submit(&self, request: SubmitRequest, meta: RequestMeta) -> GateResult<String> {
        self.submit_at(request, meta, Utc::now()).await
    }

    pub async fn submit_at(
        &self,
        request: SubmitRequest,
        meta: RequestMeta,
        now: DateTime<Utc>,
    ) -> GateResult<String> {
        let site_key = non_empty(&request.site_key)
            .ok_or_else(|| GateError::validation("siteKey is required"))?
            .to_string();
        let credential = request
            .credential()
            .ok_or_else(|| GateError::validation("token or accessToken is required"))?;
        let payload = match &request.payload {
            Some(v) if !v.is_null() => v.clone(),
            _ => return Err(GateError::validation("payload is required")),
        };

        if request.honeypot.as_deref().is_some_and(|h| !h.is_empty()) {
            tracing::warn!(
                site_key = %site_key,
                client_ip = meta.ip.as_deref().unwrap_or("-"),
                "honeypot field filled, rejecting submission"
            );
            return Err(GateError::HoneypotTriggered);
        }

        match self.registry.find_by_site_key(&site_key).await? {
            Some(site) => {
                if !self.origin_guard.is_allowed(&site, meta.origin.as_deref()) {
                    return Err(GateError::OriginNotAllowed {
                        origin: meta.origin.clone().unwrap_or_default(),
                    });
                }
            }
            None => {
                tracing::debug!(site_key = %site_key, "unknown site, origin check skipped");
            }
        }

        let redemption = self
            .tokens
            .redeem_for_submission_at(&site_key, &credential, now)?;

        let submission = Submission {
            event_id: ids::event_id(),
            site_key,
            payload,
            fingerprint: non_empty(&request.fingerprint).map(str::to_string),
            ip: meta.ip,
            user_agent: meta.user_agent,
            origin: meta.origin,
            created_at: now,
        };
        if let Err(err) = self.store.store_submission(&submission).await {
            self.tokens.rollback_redemption(&credential, redemption);
            return Err(err.into());
        }
        tracing::info!(
            event_id = %submission.event_id,
            site_key = %submission.site_key,
            via = match credential {
                SubmitCredential::Access(_) => "access_token",
                SubmitCredential::Challenge(_) => "token",
            },
            "submission recorded"
        );
        Ok(submission.event_id)
    }
}
