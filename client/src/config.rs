//! Configuration management for the client.

use crate::reconciler::{FailedItemPolicy, ReconcilerConfig};
use crate::stats::DEFAULT_CAS_ATTEMPTS;
use std::env;
use std::path::PathBuf;

/// Number of recent tests shown by default.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Quizsync server
    pub remote_url: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// Directory holding the local store files
    pub data_dir: PathBuf,
    /// Compare-and-swap attempts per aggregate update
    pub cas_attempts: u32,
    /// Keep failed items queued after a drain
    pub requeue_failed: bool,
    /// Tests returned by the recent-tests listing
    pub recent_limit: usize,
}

impl ClientConfig {
    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let remote_url = lookup("QUIZSYNC_REMOTE_URL").ok_or(ConfigError::MissingRemoteUrl)?;

        let auth_token = lookup("QUIZSYNC_AUTH_TOKEN").filter(|t| !t.is_empty());

        let data_dir = lookup("QUIZSYNC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./.quizsync"));

        let cas_attempts = match lookup("QUIZSYNC_CAS_ATTEMPTS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("QUIZSYNC_CAS_ATTEMPTS", raw))?,
            None => DEFAULT_CAS_ATTEMPTS,
        };

        let requeue_failed = match lookup("QUIZSYNC_REQUEUE_FAILED") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid("QUIZSYNC_REQUEUE_FAILED", raw))?,
            None => true,
        };

        let recent_limit = match lookup("QUIZSYNC_RECENT_LIMIT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("QUIZSYNC_RECENT_LIMIT", raw))?,
            None => DEFAULT_RECENT_LIMIT,
        };

        Ok(Self {
            remote_url,
            auth_token,
            data_dir,
            cas_attempts,
            requeue_failed,
            recent_limit,
        })
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            failed_items: if self.requeue_failed {
                FailedItemPolicy::Requeue
            } else {
                FailedItemPolicy::Drop
            },
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("QUIZSYNC_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("Invalid {0} value: '{1}'")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("QUIZSYNC_REMOTE_URL", "http://localhost:3000")]).unwrap();
        assert_eq!(config.remote_url, "http://localhost:3000");
        assert_eq!(config.auth_token, None);
        assert_eq!(config.data_dir, PathBuf::from("./.quizsync"));
        assert_eq!(config.cas_attempts, 5);
        assert_eq!(config.recent_limit, 5);
        assert_eq!(
            config.reconciler_config().failed_items,
            FailedItemPolicy::Requeue
        );
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("QUIZSYNC_REMOTE_URL", "http://sync"),
            ("QUIZSYNC_AUTH_TOKEN", "u1"),
            ("QUIZSYNC_CAS_ATTEMPTS", "9"),
            ("QUIZSYNC_REQUEUE_FAILED", "false"),
            ("QUIZSYNC_RECENT_LIMIT", "10"),
        ])
        .unwrap();
        assert_eq!(config.auth_token.as_deref(), Some("u1"));
        assert_eq!(config.cas_attempts, 9);
        assert_eq!(config.recent_limit, 10);
        assert_eq!(
            config.reconciler_config().failed_items,
            FailedItemPolicy::Drop
        );
    }

    #[test]
    fn errors() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingRemoteUrl)));
        assert!(matches!(
            load(&[("QUIZSYNC_REMOTE_URL", "x"), ("QUIZSYNC_CAS_ATTEMPTS", "0")]),
            Err(ConfigError::Invalid("QUIZSYNC_CAS_ATTEMPTS", _))
        ));
        assert!(matches!(
            load(&[("QUIZSYNC_REMOTE_URL", "x"), ("QUIZSYNC_REQUEUE_FAILED", "maybe")]),
            Err(ConfigError::Invalid("QUIZSYNC_REQUEUE_FAILED", _))
        ));
    }
}
