// Worker Registry Port - the set of known workers
use crate::domain::{DomainError, Worker, WorkerTier};
use crate::port::{IdProvider, TimeProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait WorkerRegistry: Send + Sync {
    /// Snapshot of every known worker
    async fn list(&self) -> Vec<Worker>;

    async fn get(&self, id: &str) -> Option<Worker>;

    /// Insert or replace a worker
    async fn upsert(&self, worker: Worker);

    /// Apply the IDLE -> HIBERNATED transition
    ///
    /// # Errors
    /// - DomainError::WorkerNotFound if the ID is unknown
    /// - DomainError::InvalidStateTransition if the worker is no longer IDLE
    async fn mark_hibernated(&self, id: &str) -> Result<(), DomainError>;

    /// Apply the HIBERNATED -> IDLE rollback after a failed dehydrate
    ///
    /// # Errors
    /// - DomainError::WorkerNotFound if the ID is unknown
    /// - DomainError::InvalidStateTransition if the worker was woken meanwhile
    async fn restore_idle(&self, id: &str) -> Result<(), DomainError>;
}

/// In-process registry used by the daemon and tests
pub struct InMemoryWorkerRegistry {
    workers: RwLock<HashMap<String, Worker>>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl InMemoryWorkerRegistry {
    pub fn new(id_provider: Arc<dyn IdProvider>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            id_provider,
            time_provider,
        }
    }

    /// Create and store a new IDLE worker
    pub async fn register(
        &self,
        name: impl Into<String>,
        tier: WorkerTier,
        capabilities: Vec<String>,
    ) -> Worker {
        let worker = Worker::new(
            self.id_provider.generate_id(),
            name,
            tier,
            self.time_provider.now_millis(),
        )
        .with_capabilities(capabilities);

        self.workers
            .write()
            .await
            .insert(worker.id.clone(), worker.clone());
        worker
    }

    pub async fn activate(&self, id: &str) -> Result<(), DomainError> {
        let now = self.time_provider.now_millis();
        let mut workers = self.workers.write().await;
        let worker = workers
            .get_mut(id)
            .ok_or_else(|| DomainError::WorkerNotFound(id.to_string()))?;
        worker.activate(now)
    }

    pub async fn mark_idle(&self, id: &str) -> Result<(), DomainError> {
        let now = self.time_provider.now_millis();
        let mut workers = self.workers.write().await;
        let worker = workers
            .get_mut(id)
            .ok_or_else(|| DomainError::WorkerNotFound(id.to_string()))?;
        worker.mark_idle(now)
    }
}

#[async_trait]
impl WorkerRegistry for InMemoryWorkerRegistry {
    async fn list(&self) -> Vec<Worker> {
        let mut workers: Vec<Worker> = self.workers.read().await.values().cloned().collect();
        workers.sort_by(|a, b| a.id.cmp(&b.id));
        workers
    }

    async fn get(&self, id: &str) -> Option<Worker> {
        self.workers.read().await.get(id).cloned()
    }

    async fn upsert(&self, worker: Worker) {
        self.workers.write().await.insert(worker.id.clone(), worker);
    }

    async fn mark_hibernated(&self, id: &str) -> Result<(), DomainError> {
        let mut workers = self.workers.write().await;
        let worker = workers
            .get_mut(id)
            .ok_or_else(|| DomainError::WorkerNotFound(id.to_string()))?;
        worker.hibernate()
    }

    async fn restore_idle(&self, id: &str) -> Result<(), DomainError> {
        let mut workers = self.workers.write().await;
        let worker = workers
            .get_mut(id)
            .ok_or_else(|| DomainError::WorkerNotFound(id.to_string()))?;
        worker.restore_idle()
    }
}
