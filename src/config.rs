//! Runtime configuration.
//!
//! Resolved once at process startup from the environment (optionally seeded
//! from a `.env` file) and passed down; nothing else reads env vars.

use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = "clinic.db";
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

pub const DB_PATH_VAR: &str = "CLINIC_DB_PATH";
pub const SERVER_ADDR_VAR: &str = "CLINIC_SERVER_ADDR";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    db_path: PathBuf,
    server_addr: String,
}

impl AppConfig {
    pub fn new(db_path: PathBuf, server_addr: String) -> Self {
        Self {
            db_path,
            server_addr,
        }
    }

    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        // A missing .env file is the normal case
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            db_path: PathBuf::from(value(DB_PATH_VAR, DEFAULT_DB_PATH)),
            server_addr: value(SERVER_ADDR_VAR, DEFAULT_SERVER_ADDR),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Install the `tracing` subscriber used by both binaries.
///
/// `RUST_LOG` wins when set; otherwise this crate logs at `info`.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clinic_analytics=info"));

    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.db_path(), Path::new(DEFAULT_DB_PATH));
        assert_eq!(config.server_addr(), DEFAULT_SERVER_ADDR);
    }

    #[test]
    fn test_lookup_overrides() {
        let env: HashMap<&str, &str> = [
            (DB_PATH_VAR, "/var/lib/clinic/data.db"),
            (SERVER_ADDR_VAR, "127.0.0.1:8080"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.db_path(), Path::new("/var/lib/clinic/data.db"));
        assert_eq!(config.server_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = AppConfig::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(config, AppConfig::default());
    }
}
