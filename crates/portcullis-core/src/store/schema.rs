//! SQLite schema for the durable backend.
//!
//! Tables:
//! - `sites`: tenant records, `site_key` unique
//! - `submissions`: append-only event log

/// DDL for gateway tables. Create-if-absent, no migrations.
pub const GATEWAY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sites (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    domains     TEXT NOT NULL DEFAULT '[]',
    site_key    TEXT NOT NULL UNIQUE,
    secret_key  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS submissions (
    event_id    TEXT PRIMARY KEY,
    site_key    TEXT NOT NULL,
    payload     TEXT NOT NULL CHECK (json_valid(payload)),
    fingerprint TEXT,
    ip          TEXT,
    ua          TEXT,
    origin      TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sites_site_key
    ON sites(site_key);
CREATE INDEX IF NOT EXISTS idx_submissions_site_key
    ON submissions(site_key);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_valid_sql() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(GATEWAY_SCHEMA).unwrap();
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(GATEWAY_SCHEMA).unwrap();
        conn.execute_batch(GATEWAY_SCHEMA).unwrap();
    }

    #[test]
    fn test_payload_must_be_json() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(GATEWAY_SCHEMA).unwrap();
        let res = conn.execute(
            "INSERT INTO submissions (event_id, site_key, payload, created_at) VALUES ('e', 'k', 'not json', 'now')",
            [],
        );
        assert!(res.is_err());
    }
}
