//! Command-line and environment configuration.

use clap::{builder::BoolishValueParser, ArgAction, Parser, ValueEnum};
use portcullis_core::rate_limit::{
    DEFAULT_GLOBAL_LIMIT, DEFAULT_SUBMIT_LIMIT, DEFAULT_VERIFY_LIMIT,
};
use portcullis_core::{
    GatewayOptions, MemoryStore, Persistence, RateLimiters, SqliteStore, StorageError,
    TokenPolicy,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "portcullis",
    version,
    about = "Multi-tenant verification gateway: challenge tokens, origin policy and gated submissions"
)]
pub struct ServerArgs {
    /// Listen address
    #[arg(long, env = "PORTCULLIS_BIND", default_value = "0.0.0.0:4000")]
    pub bind: SocketAddr,

    /// Secret required in `x-admin-api-key` to register sites (unset: registration disabled)
    #[arg(long, env = "ADMIN_API_KEY", hide_env_values = true)]
    pub admin_api_key: Option<String>,

    /// SQLite database file; selects the durable backend
    #[arg(long, env = "PORTCULLIS_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Keep everything in memory even when a database path is set
    #[arg(long, env = "DISABLE_DB", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub disable_db: bool,

    #[arg(long, env = "PORTCULLIS_TOKEN_TTL_SECS", default_value_t = 300)]
    pub token_ttl_secs: u64,

    /// Minimum age of a raw challenge token at submission
    #[arg(long, env = "PORTCULLIS_MIN_SUBMIT_DELAY_MS", default_value_t = 0)]
    pub min_submit_delay_ms: u64,

    /// Verify each challenge once and redeem each access token once
    #[arg(long, env = "PORTCULLIS_SINGLE_USE_TOKENS", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub single_use_tokens: bool,

    #[arg(long, env = "PORTCULLIS_RATE_WINDOW_SECS", default_value_t = 60)]
    pub rate_window_secs: u64,

    #[arg(long, env = "PORTCULLIS_GLOBAL_LIMIT", default_value_t = DEFAULT_GLOBAL_LIMIT)]
    pub global_limit: u32,

    #[arg(long, env = "PORTCULLIS_VERIFY_LIMIT", default_value_t = DEFAULT_VERIFY_LIMIT)]
    pub verify_limit: u32,

    #[arg(long, env = "PORTCULLIS_SUBMIT_LIMIT", default_value_t = DEFAULT_SUBMIT_LIMIT)]
    pub submit_limit: u32,

    /// Use the first `X-Forwarded-For` entry as the client address (behind a proxy only)
    #[arg(long, env = "PORTCULLIS_TRUST_FORWARDED_FOR", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub trust_forwarded_for: bool,

    #[arg(long, env = "PORTCULLIS_LOG_FORMAT", value_enum, default_value_t)]
    pub log_format: LogFormat,
}

impl ServerArgs {
    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            ttl: Duration::from_secs(self.token_ttl_secs),
            min_submit_delay: Duration::from_millis(self.min_submit_delay_ms),
            single_use: self.single_use_tokens,
        }
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            token_policy: self.token_policy(),
            admin_secret: self.admin_api_key.clone(),
        }
    }

    pub fn rate_limiters(&self) -> RateLimiters {
        RateLimiters::new(
            Duration::from_secs(self.rate_window_secs.max(1)),
            self.global_limit,
            self.verify_limit,
            self.submit_limit,
        )
    }
}

/// Which persistence backend the process runs on. Decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageChoice {
    Memory,
    Sqlite(PathBuf),
}

impl StorageChoice {
    pub fn from_config(args: &ServerArgs) -> Self {
        match (&args.db_path, args.disable_db) {
            (Some(path), false) => Self::Sqlite(path.clone()),
            _ => Self::Memory,
        }
    }

    pub fn build(&self) -> Result<Arc<dyn Persistence>, StorageError> {
        Ok(match self {
            Self::Memory => Arc::new(MemoryStore::new()),
            Self::Sqlite(path) => Arc::new(SqliteStore::open(path)?),
        })
    }
}
