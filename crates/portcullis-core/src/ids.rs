//! Credential and identifier generation.
//!
//! Site keys, secret keys and tokens are bearer credentials, so they are drawn
//! from the operating system CSPRNG. Identifiers that carry no security weight
//! (site id, challenge id, event id) are UUID v4.

use rand::rngs::OsRng;
use rand::RngCore;

pub const SITE_KEY_PREFIX: &str = "pk_";
pub const SECRET_KEY_PREFIX: &str = "sk_";
pub const CHALLENGE_TOKEN_PREFIX: &str = "tok_";
pub const ACCESS_TOKEN_PREFIX: &str = "acc_";
pub const CHALLENGE_ID_PREFIX: &str = "chl_";
pub const EVENT_ID_PREFIX: &str = "evt_";

/// Random bytes behind every key and token.
pub const CREDENTIAL_BYTES: usize = 24;

fn random_hex(len: usize) -> String {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

fn prefixed_credential(prefix: &str) -> String {
    format!("{}{}", prefix, random_hex(CREDENTIAL_BYTES))
}

pub fn site_key() -> String {
    prefixed_credential(SITE_KEY_PREFIX)
}

pub fn secret_key() -> String {
    prefixed_credential(SECRET_KEY_PREFIX)
}

pub fn challenge_token() -> String {
    prefixed_credential(CHALLENGE_TOKEN_PREFIX)
}

pub fn access_token() -> String {
    prefixed_credential(ACCESS_TOKEN_PREFIX)
}

pub fn site_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn challenge_id() -> String {
    format!("{}{}", CHALLENGE_ID_PREFIX, uuid::Uuid::new_v4().simple())
}

pub fn event_id() -> String {
    format!("{}{}", EVENT_ID_PREFIX, uuid::Uuid::new_v4().simple())
}

/// Shortened form of a credential for log lines.
pub fn redact(value: &str) -> String {
    let visible: String = value.chars().take(10).collect();
    if visible.len() < value.len() {
        format!("{}…", visible)
    } else {
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn credentials_carry_distinct_prefixes() {
        assert!(site_key().starts_with("pk_"));
        assert!(secret_key().starts_with("sk_"));
        assert!(challenge_token().starts_with("tok_"));
        assert!(access_token().starts_with("acc_"));
        assert!(challenge_id().starts_with("chl_"));
        assert!(event_id().starts_with("evt_"));
    }

    #[test]
    fn credential_length_matches_entropy() {
        let key = site_key();
        assert_eq!(key.len(), SITE_KEY_PREFIX.len() + CREDENTIAL_BYTES * 2);
    }

    #[test]
    fn tokens_do_not_collide() {
        let tokens: HashSet<String> = (0..2_000).map(|_| challenge_token()).collect();
        assert_eq!(tokens.len(), 2_000);
    }

    #[test]
    fn redact_keeps_prefix_only() {
        let token = challenge_token();
        let shown = redact(&token);
        assert!(shown.starts_with("tok_"));
        assert!(shown.chars().count() < token.len());
        assert_eq!(redact("short"), "short");
    }
}
