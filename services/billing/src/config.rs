use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context as _, anyhow};

use crate::domain::types::{OUTBOX_BATCH_SIZE, OUTBOX_MAX_RETRIES, OUTBOX_POLL_INTERVAL_MS};
use crate::relay::RelaySettings;

/// Billing service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// TCP port to listen on (default 3000). Env var: `BILLING_PORT`.
    pub billing_port: u16,
    /// Relay tick period in milliseconds. Env var: `OUTBOX_POLL_INTERVAL_MS`.
    pub outbox_poll_interval_ms: u64,
    /// Env var: `OUTBOX_BATCH_SIZE`.
    pub outbox_batch_size: u64,
    /// Env var: `OUTBOX_MAX_RETRIES`.
    pub outbox_max_retries: i32,
    /// Broker failure injection armed at startup. Env var:
    /// `BROKER_FAILURES_BEFORE_SUCCESS`.
    pub broker_failures_before_success: u32,
}

impl BillingConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL is not set"))?;
        let config = Self {
            database_url,
            billing_port: parse_or(&lookup, "BILLING_PORT", 3000)?,
            outbox_poll_interval_ms: parse_or(&lookup, "OUTBOX_POLL_INTERVAL_MS", OUTBOX_POLL_INTERVAL_MS)?,
            outbox_batch_size: parse_or(&lookup, "OUTBOX_BATCH_SIZE", OUTBOX_BATCH_SIZE)?,
            outbox_max_retries: parse_or(&lookup, "OUTBOX_MAX_RETRIES", OUTBOX_MAX_RETRIES)?,
            broker_failures_before_success: parse_or(&lookup, "BROKER_FAILURES_BEFORE_SUCCESS", 0)?,
        };
        if config.outbox_poll_interval_ms == 0 {
            anyhow::bail!("OUTBOX_POLL_INTERVAL_MS must be greater than zero");
        }
        Ok(config)
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            poll_interval: Duration::from_millis(self.outbox_poll_interval_ms),
            batch_size: self.outbox_batch_size,
            max_retries: self.outbox_max_retries,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
