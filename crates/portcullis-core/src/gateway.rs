//! Process-wide context owning every component.
//!
//! One [`Gateway`] is built at startup and shared (behind `Arc`) by all
//! request handlers. Tests build a fresh one per case.

use crate::admin::{constant_time_eq, AdminGate};
use crate::error::{GateError, GateResult};
use crate::ledger::{SubmissionLedger, SubmitRequest};
use crate::model::{RequestMeta, Site};
use crate::origin::OriginGuard;
use crate::registry::SiteRegistry;
use crate::scoring::{AlwaysPass, RiskAssessment, RiskScorer, VerificationKind};
use crate::store::Persistence;
use crate::tokens::{IssuedChallenge, TokenKind, TokenPolicy, TokenService};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    pub token_policy: TokenPolicy,
    pub admin_secret: Option<String>,
}

/// Result of a successful client verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    pub assessment: RiskAssessment,
    pub access_token: String,
}

pub struct Gateway {
    store: Arc<dyn Persistence>,
    registry: Arc<SiteRegistry>,
    tokens: Arc<TokenService>,
    ledger: SubmissionLedger,
    admin: AdminGate,
    origin_guard: OriginGuard,
    scorer: Arc<dyn RiskScorer>,
}

/// Present and not blank. Lookups use the value exactly as sent.
fn required<'a>(value: Option<&'a str>, field: &str) -> GateResult<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| GateError::validation(format!("{field} is required")))
}

impl Gateway {
    pub fn new(store: Arc<dyn Persistence>, options: GatewayOptions) -> Self {
        let registry = Arc::new(SiteRegistry::new(store.clone()));
        let tokens = Arc::new(TokenService::new(options.token_policy));
        let ledger = SubmissionLedger::new(store.clone(), registry.clone(), tokens.clone());
        Self {
            store,
            registry,
            tokens,
            ledger,
            admin: AdminGate::new(options.admin_secret),
            origin_guard: OriginGuard,
            scorer: Arc::new(AlwaysPass),
        }
    }

    /// Replace the default always-pass scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn RiskScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Create storage tables. Failure here must stop the process.
    pub async fn init(&self) -> GateResult<()> {
        self.store.init_schema().await?;
        tracing::info!(
            backend = self.store.backend_name(),
            admin_configured = self.admin.is_configured(),
            "gateway storage ready"
        );
        Ok(())
    }

    pub fn storage_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn store(&self) -> &Arc<dyn Persistence> {
        &self.store
    }

    /// Register a site, gated by the admin key.
    pub async fn create_site(
        &self,
        admin_key: Option<&str>,
        name: Option<&str>,
        domains: Vec<String>,
    ) -> GateResult<Site> {
        if !self.admin.authorize(admin_key) {
            tracing::warn!("site registration with bad admin key");
            return Err(GateError::Unauthorized);
        }
        self.registry
            .create_site(name.unwrap_or_default(), domains)
            .await
    }

    pub fn challenge(&self, site_key: Option<&str>) -> GateResult<IssuedChallenge> {
        self.tokens.issue_challenge(required(site_key, "siteKey")?)
    }

    pub async fn verify(
        &self,
        site_key: Option<&str>,
        token: Option<&str>,
        origin: Option<&str>,
    ) -> GateResult<VerifyOutcome> {
        self.verify_at(site_key, token, origin, Utc::now()).await
    }

    /// Client verification: origin policy, then challenge exchange.
    pub async fn verify_at(
        &self,
        site_key: Option<&str>,
        token: Option<&str>,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> GateResult<VerifyOutcome> {
        let site_key = required(site_key, "siteKey")?;
        let token = required(token, "token")?;

        if let Some(site) = self.registry.find_by_site_key(site_key).await? {
            if !self.origin_guard.is_allowed(&site, origin) {
                return Err(GateError::OriginNotAllowed {
                    origin: origin.unwrap_or_default().to_string(),
                });
            }
        }

        let access_token = self.tokens.verify_challenge_at(site_key, token, now)?;
        let assessment = self.scorer.assess(site_key, VerificationKind::Client);
        Ok(VerifyOutcome {
            assessment,
            access_token,
        })
    }

    pub async fn verify_server(
        &self,
        site_key: Option<&str>,
        token: Option<&str>,
        secret_key: Option<&str>,
    ) -> GateResult<RiskAssessment> {
        self.verify_server_at(site_key, token, secret_key, Utc::now())
            .await
    }

    /// Site backend verification: secret key, then a read-only token check.
    pub async fn verify_server_at(
        &self,
        site_key: Option<&str>,
        token: Option<&str>,
        secret_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> GateResult<RiskAssessment> {
        let site_key = required(site_key, "siteKey")?;
        let token = required(token, "token")?;
        let secret_key = required(secret_key, "secretKey")?;

        let site = self
            .registry
            .find_by_site_key(site_key)
            .await?
            .ok_or(GateError::InvalidSecret)?;
        if !constant_time_eq(&site.secret_key, secret_key) {
            tracing::warn!(site_key, "server verification with wrong secret");
            return Err(GateError::InvalidSecret);
        }

        let kind = self.tokens.check_at(site_key, token, now)?;
        tracing::debug!(
            site_key,
            via = match kind {
                TokenKind::Challenge => "token",
                TokenKind::Access => "access_token",
            },
            "server verification passed"
        );
        Ok(self.scorer.assess(site_key, VerificationKind::Server))
    }

    pub async fn submit(&self, request: SubmitRequest, meta: RequestMeta) -> GateResult<String> {
        self.ledger.submit(request, meta).await
    }

    pub async fn submit_at(
        &self,
        request: SubmitRequest,
        meta: RequestMeta,
        now: DateTime<Utc>,
    ) -> GateResult<String> {
        self.ledger.submit_at(request, meta, now).await
    }

    /// Drop expired token records.
    pub fn purge_expired(&self) -> usize {
        self.tokens.purge_expired_at(Utc::now())
    }
}
