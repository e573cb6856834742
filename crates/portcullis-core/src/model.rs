//! Persisted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: String,
    /// Allowed hostnames. Empty means every origin is accepted.
    pub domains: Vec<String>,
    pub site_key: String,
    /// Server-only credential.
    pub secret_key: String,
    pub created_at: DateTime<Utc>,
}

/// Client context captured alongside a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub origin: Option<String>,
}

/// Immutable audit record of an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub event_id: String,
    pub site_key: String,
    pub payload: serde_json::Value,
    pub fingerprint: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
}
