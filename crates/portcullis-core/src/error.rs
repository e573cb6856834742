//! Error taxonomy shared by every gateway operation.

use crate::store::StorageError;
use std::time::Duration;

/// Gateway errors. Each variant maps to one stable wire kind.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Missing or malformed required field.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Bad or missing administrative key.
    #[error("unauthorized")]
    Unauthorized,

    /// Site secret missing from the registry or mismatched.
    #[error("invalid site secret")]
    InvalidSecret,

    /// Token unknown, consumed, or bound to another site.
    #[error("invalid token")]
    InvalidToken,

    /// Token older than the configured TTL.
    #[error("token expired")]
    TokenExpired,

    /// Raw challenge token submitted before the minimum delay.
    #[error("submitted too fast: {remaining:?} left")]
    SubmitTooFast { remaining: Duration },

    /// Declared origin is not on the site's allowlist.
    #[error("origin not allowed: {origin}")]
    OriginNotAllowed { origin: String },

    /// Hidden form field was filled in.
    #[error("honeypot triggered")]
    HoneypotTriggered,

    /// Request ceiling exceeded for the current window.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Persistence backend failure. Detail is for server-side logs only.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl GateError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Stable snake_case identifier used in `{ok:false, error:<kind>}`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::InvalidSecret => "invalid_secret",
            Self::InvalidToken => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::SubmitTooFast { .. } => "submit_too_fast",
            Self::OriginNotAllowed { .. } => "origin_not_allowed",
            Self::HoneypotTriggered => "honeypot_triggered",
            Self::RateLimited { .. } => "rate_limited",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Seconds a client should wait before retrying, when that is meaningful.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::SubmitTooFast { remaining } => Some(*remaining),
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Result type for gateway operations.
pub type GateResult<T> = Result<T, GateError>;
