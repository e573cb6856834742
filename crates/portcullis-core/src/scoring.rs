//! Risk scoring extension point.
//!
//! No scoring model exists yet. [`AlwaysPass`] returns fixed scores so the
//! verification responses keep their shape; a real scorer replaces it through
//! [`Gateway::with_scorer`](crate::Gateway::with_scorer).

use serde::Serialize;

/// Which verification path asked for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationKind {
    /// Browser widget exchanging a challenge token.
    Client,
    /// Site backend checking a token with its secret key.
    Server,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub reason: String,
}

pub trait RiskScorer: Send + Sync {
    fn assess(&self, site_key: &str, kind: VerificationKind) -> RiskAssessment;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysPass;

impl RiskScorer for AlwaysPass {
    fn assess(&self, _site_key: &str, kind: VerificationKind) -> RiskAssessment {
        let score = match kind {
            VerificationKind::Client => 0.99,
            VerificationKind::Server => 1.0,
        };
        RiskAssessment {
            score,
            reason: "passed".to_string(),
        }
    }
}
