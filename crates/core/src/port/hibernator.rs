// Hibernator port - external "dehydrate" operation
use crate::domain::Worker;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HibernateError {
    #[error("Failed to persist worker {worker_id}: {reason}")]
    PersistFailed { worker_id: String, reason: String },
}

/// Suspends a worker to reclaim memory. How state is persisted is up to
/// the implementation.
#[async_trait]
pub trait Hibernator: Send + Sync {
    async fn dehydrate(&self, worker: &Worker) -> Result<(), HibernateError>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records dehydrated workers; can be told to fail for specific IDs
    #[derive(Default)]
    pub struct MockHibernator {
        dehydrated: Mutex<Vec<String>>,
        failing: Mutex<HashSet<String>>,
    }

    impl MockHibernator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_for(&self, worker_id: &str) {
            self.failing.lock().unwrap().insert(worker_id.to_string());
        }

        pub fn dehydrated(&self) -> Vec<String> {
            self.dehydrated.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Hibernator for MockHibernator {
        async fn dehydrate(&self, worker: &Worker) -> Result<(), HibernateError> {
            if self.failing.lock().unwrap().contains(&worker.id) {
                return Err(HibernateError::PersistFailed {
                    worker_id: worker.id.clone(),
                    reason: "disk full".to_string(),
                });
            }
            self.dehydrated.lock().unwrap().push(worker.id.clone());
            Ok(())
        }
    }
}
