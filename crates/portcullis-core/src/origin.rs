//! Per-site origin allowlisting.
//!
//! Fail-open cases:
//! - a site with no configured domains accepts every origin
//! - an absent or unparsable `Origin` is accepted

use crate::model::Site;
use url::Url;

/// Extract the lowercase hostname from an `Origin` header value.
pub fn origin_host(origin: &str) -> Option<String> {
    let url = Url::parse(origin.trim()).ok()?;
    let host = url.host_str()?;
    // IPv6 hosts come back bracketed.
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

/// True when `host` equals `domain` or is a proper subdomain of it.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Origin policy check for one site.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginGuard;

impl OriginGuard {
    pub fn is_allowed(&self, site: &Site, origin: Option<&str>) -> bool {
        if site.domains.is_empty() {
            return true;
        }
        let Some(host) = origin.and_then(origin_host) else {
            tracing::debug!(
                site_key = %site.site_key,
                origin = origin.unwrap_or(""),
                "origin absent or unparsable, allowing"
            );
            return true;
        };
        site.domains.iter().any(|d| host_matches(&host, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn site(domains: &[&str]) -> Site {
        Site {
            id: "s".into(),
            name: "n".into(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
            site_key: "pk_x".into(),
            secret_key: "sk_x".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unrestricted_site_allows_everything() {
        let guard = OriginGuard;
        assert!(guard.is_allowed(&site(&[]), Some("https://anything.test")));
        assert!(guard.is_allowed(&site(&[]), None));
    }

    #[test]
    fn test_exact_match() {
        let guard = OriginGuard;
        assert!(guard.is_allowed(&site(&["domain.com"]), Some("https://domain.com")));
        assert!(guard.is_allowed(
            &site(&["domain.com"]),
            Some("http://domain.com:8080")
        ));
    }

    #[test]
    fn test_proper_subdomain_matches() {
        let guard = OriginGuard;
        let s = site(&["domain.com"]);
        assert!(guard.is_allowed(&s, Some("https://www.domain.com")));
        assert!(guard.is_allowed(&s, Some("https://a.b.domain.com")));
    }

    #[test]
    fn test_suffix_without_dot_does_not_match() {
        let guard = OriginGuard;
        let s = site(&["domain.com"]);
        assert!(!guard.is_allowed(&s, Some("https://evildomain.com")));
        assert!(!guard.is_allowed(&s, Some("https://notdomain.com")));
        assert!(!guard.is_allowed(&s, Some("https://domain.com.evil.net")));
    }

    #[test]
    fn test_unparsable_origin_fails_open() {
        let guard = OriginGuard;
        let s = site(&["domain.com"]);
        assert!(guard.is_allowed(&s, None));
        assert!(guard.is_allowed(&s, Some("not a url")));
        assert!(guard.is_allowed(&s, Some("null")));
    }

    #[test]
    fn test_case_insensitive_hosts() {
        let guard = OriginGuard;
        assert!(guard.is_allowed(&site(&["Domain.COM"]), Some("https://WWW.domain.com")));
    }

    #[test]
    fn test_origin_host_extraction() {
        assert_eq!(origin_host("https://Example.com:443").as_deref(), Some("example.com"));
        assert_eq!(origin_host("http://[::1]:3000").as_deref(), Some("::1"));
        assert_eq!(origin_host("garbage"), None);
    }
}
