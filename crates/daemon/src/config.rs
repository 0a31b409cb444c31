//! Daemon configuration from environment variables
//!
//! | variable                      | default  |
//! |-------------------------------|----------|
//! | `ARBITER_MODE`                | NORMAL   |
//! | `ARBITER_GRACE_SECS`          | 60       |
//! | `ARBITER_MAX_QUEUE_WAIT_SECS` | unset    |
//! | `ARBITER_PRUNE_INTERVAL_SECS` | 30       |
//! | `ARBITER_COMMAND_TIMEOUT_SECS`| 5        |
//! | `ARBITER_SMART_PAGING`        | true     |
//! | `ARBITER_WORKERS`             | empty    |
//! | `ARBITER_LOG_FORMAT`          | pretty   |
//! | `ARBITER_LOG_DIR`             | unset    |

use anyhow::{anyhow, Context, Result};
use arbiter_core::application::constants::{COMMAND_TIMEOUT, DEFAULT_PRUNE_INTERVAL};
use arbiter_core::application::{ArbiterConfig, PruneConfig};
use arbiter_core::domain::{SystemMode, WorkerTier};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("expected \"pretty\" or \"json\", got {:?}", other)),
        }
    }
}

/// Worker registered at startup (`name:TIER`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSeed {
    pub name: String,
    pub tier: WorkerTier,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub mode: SystemMode,
    pub arbiter: ArbiterConfig,
    pub prune: PruneConfig,
    pub prune_interval: Duration,
    pub command_timeout: Duration,
    pub workers: Vec<WorkerSeed>,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mode = match lookup("ARBITER_MODE") {
            Some(raw) => SystemMode::from_str(&raw).context("ARBITER_MODE")?,
            None => SystemMode::default(),
        };

        let mut arbiter = ArbiterConfig::default();
        if let Some(secs) = parse_secs(&lookup, "ARBITER_GRACE_SECS")? {
            arbiter.startup_grace = secs;
        }
        arbiter.max_queue_wait = parse_secs(&lookup, "ARBITER_MAX_QUEUE_WAIT_SECS")?;
        arbiter
            .validate()
            .map_err(|e| anyhow!("invalid arbiter settings: {}", e))?;

        let smart_paging = match lookup("ARBITER_SMART_PAGING") {
            Some(raw) => parse_bool(&raw).context("ARBITER_SMART_PAGING")?,
            None => true,
        };

        let prune_interval =
            parse_secs(&lookup, "ARBITER_PRUNE_INTERVAL_SECS")?.unwrap_or(DEFAULT_PRUNE_INTERVAL);
        if prune_interval.is_zero() {
            return Err(anyhow!("ARBITER_PRUNE_INTERVAL_SECS must be positive"));
        }

        let command_timeout =
            parse_secs(&lookup, "ARBITER_COMMAND_TIMEOUT_SECS")?.unwrap_or(COMMAND_TIMEOUT);
        if command_timeout.is_zero() {
            return Err(anyhow!("ARBITER_COMMAND_TIMEOUT_SECS must be positive"));
        }

        let workers = match lookup("ARBITER_WORKERS") {
            Some(raw) => parse_workers(&raw).context("ARBITER_WORKERS")?,
            None => Vec::new(),
        };

        let log_format = match lookup("ARBITER_LOG_FORMAT") {
            Some(raw) => LogFormat::from_str(&raw).context("ARBITER_LOG_FORMAT")?,
            None => LogFormat::Pretty,
        };

        Ok(Self {
            mode,
            arbiter,
            prune: PruneConfig { smart_paging },
            prune_interval,
            command_timeout,
            workers,
            log_format,
            log_dir: lookup("ARBITER_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("{} must be whole seconds, got {:?}", key, raw))
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got {:?}", other)),
    }
}

/// `planner:CORE,coder:WORKER,reviewer` (tier defaults to STANDARD)
fn parse_workers(raw: &str) -> Result<Vec<WorkerSeed>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (name, tier) = match entry.split_once(':') {
                Some((name, tier)) => (name.trim(), WorkerTier::from_str(tier)?),
                None => (entry, WorkerTier::Standard),
            };
            if name.is_empty() {
                return Err(anyhow!("empty worker name in {:?}", entry));
            }
            Ok(WorkerSeed {
                name: name.to_string(),
                tier,
            })
        })
        .collect()
}
