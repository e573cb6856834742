use super::{Persistence, StorageError, StorageResult};
use crate::model::{Site, Submission};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Append-only submission log with its lookup indexes.
#[derive(Default)]
struct SubmissionLog {
    events: Vec<Submission>,
    event_ids: HashSet<String>,
    per_site: HashMap<String, u64>,
}

/// Ephemeral backend. Data lives as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    sites: RwLock<HashMap<String, Site>>,
    submissions: RwLock<SubmissionLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded submissions for one site, oldest first.
    pub async fn submissions_for(&self, site_key: &str) -> Vec<Submission> {
        let log = self.submissions.read().await;
        log.events
            .iter()
            .filter(|s| s.site_key == site_key)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn init_schema(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn store_site(&self, site: &Site) -> StorageResult<()> {
        let mut sites = self.sites.write().await;
        if sites.contains_key(&site.site_key) {
            return Err(StorageError::Conflict {
                field: "site_key",
                value: site.site_key.clone(),
            });
        }
        sites.insert(site.site_key.clone(), site.clone());
        Ok(())
    }

    async fn find_site_by_site_key(&self, site_key: &str) -> StorageResult<Option<Site>> {
        Ok(self.sites.read().await.get(site_key).cloned())
    }

    async fn store_submission(&self, submission: &Submission) -> StorageResult<()> {
        let mut log = self.submissions.write().await;
        if !log.event_ids.insert(submission.event_id.clone()) {
            return Err(StorageError::Conflict {
                field: "event_id",
                value: submission.event_id.clone(),
            });
        }
        *log.per_site.entry(submission.site_key.clone()).or_default() += 1;
        log.events.push(submission.clone());
        Ok(())
    }

    async fn count_submissions(&self, site_key: &str) -> StorageResult<u64> {
        let log = self.submissions.read().await;
        Ok(log.per_site.get(site_key).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn site(key: &str) -> Site {
        Site {
            id: "id-1".into(),
            name: "demo".into(),
            domains: vec!["example.com".into()],
            site_key: key.into(),
            secret_key: "sk_1".into(),
            created_at: Utc::now(),
        }
    }

    fn submission(event_id: &str, site_key: &str) -> Submission {
        Submission {
            event_id: event_id.into(),
            site_key: site_key.into(),
            payload: serde_json::json!({"n": 1}),
            fingerprint: None,
            ip: None,
            user_agent: None,
            origin: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_site_roundtrip() {
        let store = MemoryStore::new();
        store.store_site(&site("pk_1")).await.unwrap();
        let found = store.find_site_by_site_key("pk_1").await.unwrap().unwrap();
        assert_eq!(found.domains, vec!["example.com".to_string()]);
        assert_eq!(found.secret_key, "sk_1");
        assert!(store.find_site_by_site_key("pk_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_site_key_conflicts() {
        let store = MemoryStore::new();
        store.store_site(&site("pk_1")).await.unwrap();
        let err = store.store_site(&site("pk_1")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { field: "site_key", .. }));
    }

    #[tokio::test]
    async fn test_submissions_counted_per_site() {
        let store = MemoryStore::new();
        for (i, key) in ["pk_a", "pk_a", "pk_b"].iter().enumerate() {
            store
                .store_submission(&submission(&format!("evt_{i}"), key))
                .await
                .unwrap();
        }
        assert_eq!(store.count_submissions("pk_a").await.unwrap(), 2);
        assert_eq!(store.count_submissions("pk_b").await.unwrap(), 1);
        assert_eq!(store.count_submissions("pk_c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_event_id_conflicts() {
        let store = MemoryStore::new();
        store.store_submission(&submission("evt_1", "pk_a")).await.unwrap();
        let err = store
            .store_submission(&submission("evt_1", "pk_b"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { field: "event_id", .. }));
        assert_eq!(store.count_submissions("pk_a").await.unwrap(), 1);
        assert_eq!(store.count_submissions("pk_b").await.unwrap(), 0);
    }
}
