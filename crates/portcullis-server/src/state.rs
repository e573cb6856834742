use portcullis_core::{Gateway, RateLimiters};
use std::sync::Arc;

/// Shared handler state. Cloned per request; everything inside is `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub limiters: Arc<RateLimiters>,
    /// Take the client address from `X-Forwarded-For` instead of the peer.
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, limiters: Arc<RateLimiters>) -> Self {
        Self {
            gateway,
            limiters,
            trust_forwarded_for: false,
        }
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}
