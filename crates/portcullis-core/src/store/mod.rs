//! Storage capability shared by the registry and the ledger.
//!
//! Two interchangeable backends implement [`Persistence`]:
//!
//! - [`MemoryStore`]: process-lifetime maps, lost on restart
//! - [`SqliteStore`]: durable tables `sites` and `submissions`
//!
//! The backend is chosen once at startup; nothing below this trait branches on
//! which one is active.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use schema::GATEWAY_SCHEMA;
pub use sqlite::SqliteStore;

use crate::model::{Site, Submission};
use async_trait::async_trait;

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A unique key is already taken.
    #[error("conflict on {field}: {value}")]
    Conflict { field: &'static str, value: String },

    /// Stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Underlying engine error.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Corrupt(e.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Persistence: Send + Sync {
    /// Short backend label for logs.
    fn backend_name(&self) -> &'static str;

    /// Create tables if absent. Safe to call repeatedly.
    async fn init_schema(&self) -> StorageResult<()>;

    async fn store_site(&self, site: &Site) -> StorageResult<()>;

    async fn find_site_by_site_key(&self, site_key: &str) -> StorageResult<Option<Site>>;

    async fn store_submission(&self, submission: &Submission) -> StorageResult<()>;

    async fn count_submissions(&self, site_key: &str) -> StorageResult<u64>;
}
