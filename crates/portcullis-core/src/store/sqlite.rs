use super::schema::GATEWAY_SCHEMA;
use super::{Persistence, StorageError, StorageResult};
use crate::model::{Site, Submission};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Durable backend on SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a file-backed store.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_connection(conn: &Connection) -> StorageResult<()> {
        // WAL mode for file-backed DBs (no-op for in-memory)
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL");
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    }

    /// Run blocking SQLite work off the async executor.
    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Backend("sqlite connection lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("storage task failed: {e}")))?
    }
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("created_at '{raw}': {e}")))
}

fn map_unique_violation(e: rusqlite::Error, field: &'static str, value: &str) -> StorageError {
    if e.to_string().contains("UNIQUE constraint failed") {
        return StorageError::Conflict {
            field,
            value: value.to_string(),
        };
    }
    e.into()
}

#[async_trait]
impl Persistence for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn init_schema(&self) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(GATEWAY_SCHEMA)?;
            Ok(())
        })
        .await
    }

    async fn store_site(&self, site: &Site) -> StorageResult<()> {
        let site = site.clone();
        let domains = serde_json::to_string(&site.domains)?;
        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT INTO sites (id, name, domains, site_key, secret_key, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    site.id,
                    site.name,
                    domains,
                    site.site_key,
                    site.secret_key,
                    site.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| map_unique_violation(e, "site_key", &site.site_key))?;
            Ok(())
        })
        .await
    }

    async fn find_site_by_site_key(&self, site_key: &str) -> StorageResult<Option<Site>> {
        let site_key = site_key.to_string();
        self.with_conn(move |conn| {
            let row: Option<(String, String, String, String, String, String)> = conn
                .query_row(
                    r#"
                    SELECT id, name, domains, site_key, secret_key, created_at
                    FROM sites WHERE site_key = ?
                    "#,
                    [&site_key],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    },
                )
                .optional()?;

            let Some((id, name, domains, site_key, secret_key, created_at)) = row else {
                return Ok(None);
            };
            Ok(Some(Site {
                id,
                name,
                domains: serde_json::from_str(&domains)?,
                site_key,
                secret_key,
                created_at: parse_timestamp(&created_at)?,
            }))
        })
        .await
    }

    async fn store_submission(&self, submission: &Submission) -> StorageResult<()> {
        let submission = submission.clone();
        let payload = serde_json::to_string(&submission.payload)?;
        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT INTO submissions (
                    event_id, site_key, payload, fingerprint, ip, ua, origin, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    submission.event_id,
                    submission.site_key,
                    payload,
                    submission.fingerprint,
                    submission.ip,
                    submission.user_agent,
                    submission.origin,
                    submission.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| map_unique_violation(e, "event_id", &submission.event_id))?;
            Ok(())
        })
        .await
    }

    async fn count_submissions(&self, site_key: &str) -> StorageResult<u64> {
        let site_key = site_key.to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM submissions WHERE site_key = ?",
                [&site_key],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }
}
