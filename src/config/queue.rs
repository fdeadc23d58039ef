//! Queue, backend, and driver configuration.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

const ENV_PREFIX: &str = "DEADLINE_QUEUE_";

/// Backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-process heap registry.
    InMemory,
    /// Redis sorted set shared between processes.
    Redis {
        /// Server URL, e.g. `redis://127.0.0.1:6379`.
        url: String,
        /// Sorted-set key.
        #[serde(default = "default_redis_key")]
        key: String,
    },
}

fn default_redis_key() -> String {
    crate::infra::store::DEFAULT_KEY.to_owned()
}

/// Root queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Grace window ahead of a deadline inside which items are evicted.
    pub removal_threshold_ms: i64,
    /// Sleep between idle poll cycles.
    pub poll_interval_ms: u64,
    /// Where items are held.
    pub backend: BackendConfig,
    /// Bound of each fan-out consumer channel.
    pub fanout_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            removal_threshold_ms: 5_000,
            poll_interval_ms: 100,
            backend: BackendConfig::InMemory,
            fanout_capacity: 64,
        }
    }
}

impl QueueConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.removal_threshold_ms <= 0 {
            return Err("removal_threshold_ms must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if self.fanout_capacity == 0 {
            return Err("fanout_capacity must be greater than 0".into());
        }
        if let BackendConfig::Redis { url, key } = &self.backend {
            if url.trim().is_empty() {
                return Err("redis url must not be empty".into());
            }
            if key.trim().is_empty() {
                return Err("redis key must not be empty".into());
            }
        }
        Ok(())
    }

    /// Removal threshold as a duration. Call after [`validate`](Self::validate).
    pub fn removal_threshold(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.removal_threshold_ms).unwrap_or(0))
    }

    /// Poll interval as a duration.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `DEADLINE_QUEUE_*` environment variables,
    /// reading a `.env` file first if one exists. Unset variables keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Fails on an unparsable value or a configuration that does not validate.
    pub fn from_env() -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Recognised names (without the `DEADLINE_QUEUE_` prefix):
    /// `REMOVAL_THRESHOLD_MS`, `POLL_INTERVAL_MS`, `FANOUT_CAPACITY`,
    /// `BACKEND` (`in_memory` or `redis`), `REDIS_URL`, `REDIS_KEY`.
    ///
    /// # Errors
    ///
    /// Fails on an unparsable value or a configuration that does not validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(raw) = var("REMOVAL_THRESHOLD_MS") {
            cfg.removal_threshold_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PREFIX}REMOVAL_THRESHOLD_MS: invalid value `{raw}`"))?;
        }
        if let Some(raw) = var("POLL_INTERVAL_MS") {
            cfg.poll_interval_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PREFIX}POLL_INTERVAL_MS: invalid value `{raw}`"))?;
        }
        if let Some(raw) = var("FANOUT_CAPACITY") {
            cfg.fanout_capacity = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PREFIX}FANOUT_CAPACITY: invalid value `{raw}`"))?;
        }

        match var("BACKEND").as_deref().map(str::trim) {
            None | Some("in_memory") => {}
            Some("redis") => {
                let url = var("REDIS_URL").with_context(|| format!("{ENV_PREFIX}REDIS_URL is required for the redis backend"))?;
                let key = var("REDIS_KEY").unwrap_or_else(default_redis_key);
                cfg.backend = BackendConfig::Redis { url, key };
            }
            Some(other) => anyhow::bail!("{ENV_PREFIX}BACKEND: unknown backend `{other}`"),
        }

        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}
