//! Challenge and access token lifecycle.
//!
//! ```text
//!  challenge:  issued ──verify/redeem──▶ verified
//!                 │                         │
//!                 └────── ttl elapsed ──────┴──▶ expired (terminal)
//!
//!  access:     issued ── ttl elapsed ──▶ expired (terminal)
//! ```
//!
//! Expiry is `elapsed > ttl`; a token presented exactly at `issued_at + ttl`
//! is still valid.
//!
//! Unless [`TokenPolicy::single_use`] is set, the `verified` flag is recorded
//! but never consulted: a challenge token may be verified again, and either
//! token kind may be redeemed repeatedly until it expires. Clients rely on
//! this to retry a failed submission with the same token.
//!
//! Expired records stay in memory for one further TTL so late callers still
//! get [`GateError::TokenExpired`]; [`TokenService::purge_expired_at`] only
//! drops records older than twice the TTL.

use crate::error::{GateError, GateResult};
use crate::ids;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    pub ttl: Duration,
    /// Minimum age of a raw challenge token at submission time.
    pub min_submit_delay: Duration,
    /// Track consumption: verify a challenge once, redeem an access token once.
    pub single_use: bool,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TOKEN_TTL,
            min_submit_delay: Duration::ZERO,
            single_use: false,
        }
    }
}

/// Output of [`TokenService::issue_challenge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    /// Correlation id for client logs. Never accepted as a credential.
    pub challenge_id: String,
    pub token: String,
}

/// Credential presented with a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitCredential {
    Challenge(String),
    Access(String),
}

/// Consumption state captured by a redemption, used to undo it when the
/// submission it admitted could not be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
    was_used: bool,
}

/// Which kind of token a server-side check matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Challenge,
    Access,
}

#[derive(Debug, Clone)]
struct ChallengeRecord {
    site_key: String,
    issued_at: DateTime<Utc>,
    verified: bool,
}

#[derive(Debug, Clone)]
struct AccessRecord {
    site_key: String,
    issued_at: DateTime<Utc>,
    redeemed: bool,
}

#[derive(Default)]
struct TokenState {
    challenges: HashMap<String, ChallengeRecord>,
    access: HashMap<String, AccessRecord>,
}

/// In-process token store. Tokens are invisible to other processes.
pub struct TokenService {
    policy: TokenPolicy,
    state: Mutex<TokenState>,
}

fn elapsed(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    // Clock stepping backwards counts as no time passed.
    (now - issued_at).to_std().unwrap_or(Duration::ZERO)
}

impl TokenService {
    pub fn new(policy: TokenPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(TokenState::default()),
        }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    fn state(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        elapsed(issued_at, now) > self.policy.ttl
    }

    /// Age after which an expired record may be forgotten.
    fn retention(&self) -> Duration {
        self.policy.ttl.saturating_mul(2)
    }

    pub fn issue_challenge(&self, site_key: &str) -> GateResult<IssuedChallenge> {
        self.issue_challenge_at(site_key, Utc::now())
    }

    /// Like [`issue_challenge`](Self::issue_challenge) with an explicit clock.
    pub fn issue_challenge_at(
        &self,
        site_key: &str,
        now: DateTime<Utc>,
    ) -> GateResult<IssuedChallenge> {
        if site_key.trim().is_empty() {
            return Err(GateError::validation("siteKey is required"));
        }
        let issued = IssuedChallenge {
            challenge_id: ids::challenge_id(),
            token: ids::challenge_token(),
        };
        self.state().challenges.insert(
            issued.token.clone(),
            ChallengeRecord {
                site_key: site_key.to_string(),
                issued_at: now,
                verified: false,
            },
        );
        tracing::debug!(
            site_key,
            challenge_id = %issued.challenge_id,
            token = %ids::redact(&issued.token),
            "challenge issued"
        );
        Ok(issued)
    }

    pub fn verify_challenge(&self, site_key: &str, token: &str) -> GateResult<String> {
        self.verify_challenge_at(site_key, token, Utc::now())
    }

    /// Exchange a live challenge token for an access token bound to the same site.
    pub fn verify_challenge_at(
        &self,
        site_key: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> GateResult<String> {
        let mut state = self.state();
        let record = state
            .challenges
            .get_mut(token)
            .filter(|r| r.site_key == site_key)
            .ok_or(GateError::InvalidToken)?;

        if self.is_expired(record.issued_at, now) {
            return Err(GateError::TokenExpired);
        }
        if self.policy.single_use && record.verified {
            return Err(GateError::InvalidToken);
        }
        record.verified = true;

        let access_token = ids::access_token();
        state.access.insert(
            access_token.clone(),
            AccessRecord {
                site_key: site_key.to_string(),
                issued_at: now,
                redeemed: false,
            },
        );
        tracing::debug!(
            site_key,
            access_token = %ids::redact(&access_token),
            "challenge verified"
        );
        Ok(access_token)
    }

    pub fn redeem_for_submission(
        &self,
        site_key: &str,
        credential: &SubmitCredential,
    ) -> GateResult<Redemption> {
        self.redeem_for_submission_at(site_key, credential, Utc::now())
    }

    /// Admit a submission credential.
    ///
    /// Access tokens are checked for existence, tenant and expiry. Raw
    /// challenge tokens additionally must be at least `min_submit_delay` old,
    /// and are marked verified. Hand the returned [`Redemption`] to
    /// [`rollback_redemption`](Self::rollback_redemption) if the submission
    /// is not stored.
    pub fn redeem_for_submission_at(
        &self,
        site_key: &str,
        credential: &SubmitCredential,
        now: DateTime<Utc>,
    ) -> GateResult<Redemption> {
        let mut state = self.state();
        let was_used = match credential {
            SubmitCredential::Access(token) => {
                let record = state
                    .access
                    .get_mut(token)
                    .filter(|r| r.site_key == site_key)
                    .ok_or(GateError::InvalidToken)?;
                if self.is_expired(record.issued_at, now) {
                    return Err(GateError::TokenExpired);
                }
                if self.policy.single_use && record.redeemed {
                    return Err(GateError::InvalidToken);
                }
                std::mem::replace(&mut record.redeemed, true)
            }
            SubmitCredential::Challenge(token) => {
                let record = state
                    .challenges
                    .get_mut(token)
                    .filter(|r| r.site_key == site_key)
                    .ok_or(GateError::InvalidToken)?;
                let age = elapsed(record.issued_at, now);
                if age > self.policy.ttl {
                    return Err(GateError::TokenExpired);
                }
                if age < self.policy.min_submit_delay {
                    return Err(GateError::SubmitTooFast {
                        remaining: self.policy.min_submit_delay - age,
                    });
                }
                if self.policy.single_use && record.verified {
                    return Err(GateError::InvalidToken);
                }
                std::mem::replace(&mut record.verified, true)
            }
        };
        Ok(Redemption { was_used })
    }

    /// Restore the consumption flag set by a redemption. A record purged in
    /// the meantime is left alone.
    pub fn rollback_redemption(&self, credential: &SubmitCredential, redemption: Redemption) {
        let mut state = self.state();
        match credential {
            SubmitCredential::Access(token) => {
                if let Some(record) = state.access.get_mut(token) {
                    record.redeemed = redemption.was_used;
                }
            }
            SubmitCredential::Challenge(token) => {
                if let Some(record) = state.challenges.get_mut(token) {
                    record.verified = redemption.was_used;
                }
            }
        }
    }

    /// Read-only check used by server-to-server verification.
    pub fn check_at(&self, site_key: &str, token: &str, now: DateTime<Utc>) -> GateResult<TokenKind> {
        let state = self.state();
        let (kind, issued_at) = if let Some(r) = state.challenges.get(token) {
            (TokenKind::Challenge, (r.site_key == site_key).then_some(r.issued_at))
        } else if let Some(r) = state.access.get(token) {
            (TokenKind::Access, (r.site_key == site_key).then_some(r.issued_at))
        } else {
            return Err(GateError::InvalidToken);
        };
        let issued_at = issued_at.ok_or(GateError::InvalidToken)?;
        if self.is_expired(issued_at, now) {
            return Err(GateError::TokenExpired);
        }
        Ok(kind)
    }

    /// Drop records older than twice the TTL. Returns how many were removed.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let keep = self.retention();
        let mut state = self.state();
        let before = state.challenges.len() + state.access.len();
        state
            .challenges
            .retain(|_, r| elapsed(r.issued_at, now) <= keep);
        state.access.retain(|_, r| elapsed(r.issued_at, now) <= keep);
        before - (state.challenges.len() + state.access.len())
    }

    /// Outstanding (challenge, access) record counts.
    pub fn outstanding(&self) -> (usize, usize) {
        let state = self.state();
        (state.challenges.len(), state.access.len())
    }
}
