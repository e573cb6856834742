//! Mapping of gateway errors onto HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use portcullis_core::GateError;
use serde::Serialize;
use std::time::Duration;

/// Wire shape of every failure: `{ok:false, error:<kind>}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: &'static str,
}

#[derive(Debug)]
pub struct ApiError(pub GateError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            GateError::Validation { .. } | GateError::HoneypotTriggered => StatusCode::BAD_REQUEST,
            GateError::Unauthorized
            | GateError::InvalidSecret
            | GateError::InvalidToken
            | GateError::TokenExpired => StatusCode::UNAUTHORIZED,
            GateError::OriginNotAllowed { .. } => StatusCode::FORBIDDEN,
            GateError::SubmitTooFast { .. } | GateError::RateLimited { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GateError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "request body rejected");
        Self(GateError::validation("request body must be a JSON object"))
    }
}

/// Whole seconds, rounded up, never below one.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self.0 {
            GateError::Storage(detail) => {
                tracing::error!(error = %detail, "storage failure while handling request");
            }
            other => {
                tracing::debug!(kind = other.kind(), status = status.as_u16(), "request refused");
            }
        }

        let body = ErrorBody {
            ok: false,
            error: self.0.kind(),
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(wait) = self.0.retry_after() {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(wait)),
            );
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
