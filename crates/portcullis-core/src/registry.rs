//! Tenant registration and lookup.

use crate::error::{GateError, GateResult};
use crate::ids;
use crate::model::Site;
use crate::store::Persistence;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct SiteRegistry {
    store: Arc<dyn Persistence>,
}

impl SiteRegistry {
    pub fn new(store: Arc<dyn Persistence>) -> Self {
        Self { store }
    }

    /// Register a site with a fresh key pair. The caller must already be
    /// admin-authorized; the returned record includes the secret key.
    pub async fn create_site(&self, name: &str, domains: Vec<String>) -> GateResult<Site> {
        self.create_site_at(name, domains, Utc::now()).await
    }

    pub async fn create_site_at(
        &self,
        name: &str,
        domains: Vec<String>,
        now: DateTime<Utc>,
    ) -> GateResult<Site> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GateError::validation("name is required"));
        }
        let mut cleaned: Vec<String> = Vec::with_capacity(domains.len());
        for domain in domains {
            let domain = domain.trim().to_string();
            if domain.is_empty() {
                continue;
            }
            if !cleaned.contains(&domain) {
                cleaned.push(domain);
            }
        }

        let site = Site {
            id: ids::site_id(),
            name: name.to_string(),
            domains: cleaned,
            site_key: ids::site_key(),
            secret_key: ids::secret_key(),
            created_at: now,
        };
        self.store.store_site(&site).await?;
        tracing::info!(
            site_id = %site.id,
            site_key = %site.site_key,
            domains = site.domains.len(),
            "site registered"
        );
        Ok(site)
    }

    /// Exact-match lookup. Absence is not an error here.
    pub async fn find_by_site_key(&self, site_key: &str) -> GateResult<Option<Site>> {
        Ok(self.store.find_site_by_site_key(site_key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SqliteStore};

    fn registry() -> SiteRegistry {
        SiteRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let err = registry().create_site("   ", vec![]).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_create_generates_distinct_keys() {
        let reg = registry();
        let a = reg.create_site("a", vec![]).await.unwrap();
        let b = reg.create_site("b", vec![]).await.unwrap();
        assert!(a.site_key.starts_with("pk_"));
        assert!(a.secret_key.starts_with("sk_"));
        assert_ne!(a.site_key, b.site_key);
        assert_ne!(a.secret_key, b.secret_key);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_domains_trimmed_and_deduplicated() {
        let reg = registry();
        let site = reg
            .create_site(
                "shop",
                vec![
                    " example.com ".into(),
                    "".into(),
                    "example.com".into(),
                    "shop.test".into(),
                ],
            )
            .await
            .unwrap();
        assert_eq!(site.domains, vec!["example.com", "shop.test"]);
    }

    #[tokio::test]
    async fn test_find_unknown_returns_none() {
        assert!(registry().find_by_site_key("pk_missing").await.unwrap().is_none());
    }

    async fn assert_roundtrip(store: Arc<dyn Persistence>) {
        store.init_schema().await.unwrap();
        let reg = SiteRegistry::new(store.clone());
        let created = reg
            .create_site("shop", vec!["example.com".into(), "shop.test".into()])
            .await
            .unwrap();
        let found = reg
            .find_by_site_key(&created.site_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, created.name);
        assert_eq!(found.domains, created.domains);
        assert_eq!(found.site_key, created.site_key);
        assert_eq!(found.secret_key, created.secret_key);
        assert!(reg
            .find_by_site_key(&format!(" {}", created.site_key))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_roundtrip_memory() {
        assert_roundtrip(Arc::new(MemoryStore::new())).await;
    }

    #[tokio::test]
    async fn test_roundtrip_sqlite() {
        assert_roundtrip(Arc::new(SqliteStore::memory().unwrap())).await;
    }
}
