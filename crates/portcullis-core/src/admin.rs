//! Administrative key check guarding site registration.

use subtle::ConstantTimeEq;

/// Compares a presented key against the configured admin secret.
///
/// No configured secret (or an empty one) denies every request.
#[derive(Clone, Default)]
pub struct AdminGate {
    secret: Option<String>,
}

impl AdminGate {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn authorize(&self, provided: Option<&str>) -> bool {
        match (&self.secret, provided) {
            (Some(secret), Some(provided)) => constant_time_eq(secret, provided),
            _ => false,
        }
    }
}

impl std::fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Constant-time string equality (length still leaks).
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_denies_all() {
        let gate = AdminGate::new(None);
        assert!(!gate.authorize(Some("")));
        assert!(!gate.authorize(Some("anything")));
        assert!(!gate.authorize(None));
    }

    #[test]
    fn test_empty_secret_counts_as_unconfigured() {
        let gate = AdminGate::new(Some(String::new()));
        assert!(!gate.is_configured());
        assert!(!gate.authorize(Some("")));
    }

    #[test]
    fn test_matching_key_authorized() {
        let gate = AdminGate::new(Some("s3cret".into()));
        assert!(gate.authorize(Some("s3cret")));
        assert!(!gate.authorize(Some("s3cre")));
        assert!(!gate.authorize(Some("wrong")));
        assert!(!gate.authorize(None));
    }

    #[test]
    fn test_debug_hides_secret() {
        let gate = AdminGate::new(Some("s3cret".into()));
        assert!(!format!("{gate:?}").contains("s3cret"));
    }
}
