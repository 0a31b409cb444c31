// Worker Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Worker ID (opaque, UUID v4 in production)
pub type WorkerId = String;

/// Worker classification, controls how aggressively idle workers are pruned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerTier {
    Core,
    Standard,
    Worker,
}

/// Worker lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Idle,
    Active,
    Hibernated,
}

impl std::fmt::Display for WorkerTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerTier::Core => write!(f, "CORE"),
            WorkerTier::Standard => write!(f, "STANDARD"),
            WorkerTier::Worker => write!(f, "WORKER"),
        }
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Idle => write!(f, "IDLE"),
            WorkerStatus::Active => write!(f, "ACTIVE"),
            WorkerStatus::Hibernated => write!(f, "HIBERNATED"),
        }
    }
}

impl FromStr for WorkerTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CORE" => Ok(WorkerTier::Core),
            "STANDARD" => Ok(WorkerTier::Standard),
            "WORKER" => Ok(WorkerTier::Worker),
            _ => Err(DomainError::InvalidTier(s.to_string())),
        }
    }
}

/// Worker Entity
///
/// Created by the orchestration layer, mutated by callers around work
/// execution (ACTIVE <-> IDLE) and by the lifecycle scheduler
/// (IDLE -> HIBERNATED). Never deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub tier: WorkerTier,
    pub status: WorkerStatus,
    pub last_active_at: i64, // epoch ms
    pub capabilities: BTreeSet<String>,
}

impl Worker {
    /// Create a new idle worker
    ///
    /// # Arguments
    ///
    /// * `id` - Unique worker ID (injected, not generated)
    /// * `name` - Human readable name
    /// * `tier` - Pruning tier
    /// * `now` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(id: impl Into<String>, name: impl Into<String>, tier: WorkerTier, now: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier,
            status: WorkerStatus::Idle,
            last_active_at: now,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Transition to ACTIVE.
    ///
    /// Waking a HIBERNATED worker is allowed here; the caller is responsible
    /// for obtaining admission from the arbiter first.
    pub fn activate(&mut self, now: i64) -> Result<()> {
        match self.status {
            WorkerStatus::Idle | WorkerStatus::Hibernated => {
                self.status = WorkerStatus::Active;
                self.last_active_at = now;
                Ok(())
            }
            WorkerStatus::Active => Err(self.transition_error(WorkerStatus::Active)),
        }
    }

    /// Transition ACTIVE -> IDLE, stamping the moment work finished
    pub fn mark_idle(&mut self, now: i64) -> Result<()> {
        if self.status != WorkerStatus::Active {
            return Err(self.transition_error(WorkerStatus::Idle));
        }
        self.status = WorkerStatus::Idle;
        self.last_active_at = now;
        Ok(())
    }

    /// Transition IDLE -> HIBERNATED
    pub fn hibernate(&mut self) -> Result<()> {
        if self.status != WorkerStatus::Idle {
            return Err(self.transition_error(WorkerStatus::Hibernated));
        }
        self.status = WorkerStatus::Hibernated;
        Ok(())
    }

    /// Undo a hibernation claim (HIBERNATED -> IDLE). The idle clock keeps running
    /// from the original `last_active_at`.
    pub fn restore_idle(&mut self) -> Result<()> {
        if self.status != WorkerStatus::Hibernated {
            return Err(self.transition_error(WorkerStatus::Idle));
        }
        self.status = WorkerStatus::Idle;
        Ok(())
    }

    /// Idle duration in ms (0 unless IDLE)
    pub fn idle_for_ms(&self, now: i64) -> i64 {
        match self.status {
            WorkerStatus::Idle => (now - self.last_active_at).max(0),
            _ => 0,
        }
    }

    fn transition_error(&self, to: WorkerStatus) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_worker_is_idle() {
        let worker = Worker::new("w-1", "indexer", WorkerTier::Standard, 1_000)
            .with_capabilities(["search", "embed"]);

        assert_eq!(worker.status, WorkerStatus::Idle);
        assert_eq!(worker.last_active_at, 1_000);
        assert!(worker.capabilities.contains("embed"));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut worker = Worker::new("w-1", "indexer", WorkerTier::Worker, 0);

        worker.activate(10).unwrap();
        assert_eq!(worker.status, WorkerStatus::Active);

        worker.mark_idle(50).unwrap();
        assert_eq!(worker.last_active_at, 50);
        assert_eq!(worker.idle_for_ms(80), 30);

        worker.hibernate().unwrap();
        assert_eq!(worker.status, WorkerStatus::Hibernated);
        assert_eq!(worker.idle_for_ms(10_000), 0);

        worker.activate(100).unwrap();
        assert_eq!(worker.status, WorkerStatus::Active);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut worker = Worker::new("w-1", "indexer", WorkerTier::Core, 0);
        worker.activate(1).unwrap();

        let err = worker.hibernate().unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidStateTransition {
                from: "ACTIVE".to_string(),
                to: "HIBERNATED".to_string(),
            }
        );
        assert!(worker.activate(2).is_err());

        worker.mark_idle(3).unwrap();
        assert!(worker.mark_idle(4).is_err());
    }

    #[test]
    fn test_restore_idle_keeps_idle_clock() {
        let mut worker = Worker::new("w-1", "indexer", WorkerTier::Worker, 100);
        assert!(worker.restore_idle().is_err());

        worker.hibernate().unwrap();
        worker.restore_idle().unwrap();
        assert_eq!(worker.status, WorkerStatus::Idle);
        assert_eq!(worker.idle_for_ms(400), 300);

        worker.activate(500).unwrap();
        assert!(worker.restore_idle().is_err());
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("core".parse::<WorkerTier>().unwrap(), WorkerTier::Core);
        assert_eq!(" WORKER ".parse::<WorkerTier>().unwrap(), WorkerTier::Worker);
        assert!("boss".parse::<WorkerTier>().is_err());
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&WorkerStatus::Hibernated).unwrap();
        assert_eq!(json, "\"HIBERNATED\"");
    }
}
