//! Token lifecycle and submission admission engine.
//!
//! A browser widget asks for a challenge token, exchanges it for an access
//! token, then submits a JSON payload. Every step is scoped to a registered
//! site (tenant) and checked against that site's origin policy.
//!
//! ```no_run
//! use portcullis_core::{Gateway, GatewayOptions, MemoryStore, RequestMeta, SubmitRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> portcullis_core::GateResult<()> {
//! let gateway = Gateway::new(Arc::new(MemoryStore::new()), GatewayOptions::default());
//! gateway.init().await?;
//!
//! let issued = gateway.challenge(Some("pk_demo"))?;
//! let verified = gateway.verify(Some("pk_demo"), Some(&issued.token), None).await?;
//! let event_id = gateway
//!     .submit(
//!         SubmitRequest {
//!             site_key: Some("pk_demo".into()),
//!             access_token: Some(verified.access_token),
//!             payload: Some(serde_json::json!({"message": "hello"})),
//!             ..Default::default()
//!         },
//!         RequestMeta::default(),
//!     )
//!     .await?;
//! println!("stored {event_id}");
//! # Ok(())
//! # }
//! ```
//!
//! All token and rate-limit state is held in process memory. Running several
//! instances behind a load balancer needs sticky routing, since a token issued
//! by one instance is unknown to the others.

pub mod admin;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod ledger;
pub mod model;
pub mod origin;
pub mod rate_limit;
pub mod registry;
pub mod scoring;
pub mod store;
pub mod tokens;

pub use admin::AdminGate;
pub use error::{GateError, GateResult};
pub use gateway::{Gateway, GatewayOptions, VerifyOutcome};
pub use ledger::{SubmissionLedger, SubmitRequest};
pub use model::{RequestMeta, Site, Submission};
pub use origin::OriginGuard;
pub use rate_limit::{FixedWindowLimiter, RateLimitPolicy, RateLimiters};
pub use registry::SiteRegistry;
pub use scoring::{AlwaysPass, RiskAssessment, RiskScorer, VerificationKind};
pub use store::{MemoryStore, Persistence, SqliteStore, StorageError};
pub use tokens::{
    IssuedChallenge, Redemption, SubmitCredential, TokenKind, TokenPolicy, TokenService,
};
