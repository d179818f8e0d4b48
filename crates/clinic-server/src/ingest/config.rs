//! Ingestion configuration
//!
//! Worker runtime and retry settings, read from `INGEST_*` environment
//! variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::env_or;

/// Attempt budget given to every enqueued file
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

pub const DEFAULT_WORKER_CONCURRENCY: usize = 4;

/// How often apalis polls `apalis.jobs` for new work
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// How long a job may stay locked by a silent worker before apalis
/// re-enqueues it
pub const DEFAULT_LEASE_TIMEOUT_SECS: u64 = 3_600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Whether workers are started with the server
    pub enabled: bool,
    pub worker_concurrency: usize,
    pub poll_interval_ms: u64,
    pub max_attempts: i32,
    pub lease_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_concurrency: DEFAULT_WORKER_CONCURRENCY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lease_timeout_secs: DEFAULT_LEASE_TIMEOUT_SECS,
        }
    }
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            enabled: env_or("INGEST_ENABLED", defaults.enabled),
            worker_concurrency: env_or("INGEST_WORKER_CONCURRENCY", defaults.worker_concurrency),
            poll_interval_ms: env_or("INGEST_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            max_attempts: env_or("INGEST_MAX_ATTEMPTS", defaults.max_attempts),
            lease_timeout_secs: env_or("INGEST_LEASE_TIMEOUT_SECS", defaults.lease_timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts < 1 {
            anyhow::bail!("INGEST_MAX_ATTEMPTS must be at least 1");
        }
        if self.enabled {
            if self.worker_concurrency == 0 {
                anyhow::bail!("INGEST_WORKER_CONCURRENCY must be greater than 0");
            }
            if self.poll_interval_ms == 0 {
                anyhow::bail!("INGEST_POLL_INTERVAL_MS must be greater than 0");
            }
            if self.lease_timeout_secs == 0 {
                anyhow::bail!("INGEST_LEASE_TIMEOUT_SECS must be greater than 0");
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lease_timeout(&self) -> Duration {
        Duration::from_secs(self.lease_timeout_secs)
    }
}
