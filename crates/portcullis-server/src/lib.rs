//! HTTP surface for the Portcullis verification gateway.
//!
//! [`api::router`] builds the axum application from an [`AppState`]; the
//! `portcullis` binary wires it to configuration, logging and a TCP listener.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod state;

pub use api::router;
pub use config::{ServerArgs, StorageChoice};
pub use error::ApiError;
pub use state::AppState;
