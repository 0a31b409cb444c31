// Daemon-side hibernator
use arbiter_core::domain::Worker;
use arbiter_core::port::{HibernateError, Hibernator};
use async_trait::async_trait;
use tracing::info;

/// Records the dehydration in the log. Workers in this process hold no
/// state beyond the registry entry, so there is nothing else to persist.
pub struct LogHibernator;

#[async_trait]
impl Hibernator for LogHibernator {
    async fn dehydrate(&self, worker: &Worker) -> Result<(), HibernateError> {
        info!(
            worker_id = %worker.id,
            worker_name = %worker.name,
            tier = %worker.tier,
            capabilities = worker.capabilities.len(),
            "Worker dehydrated"
        );
        Ok(())
    }
}
