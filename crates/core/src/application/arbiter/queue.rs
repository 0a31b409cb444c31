// Admission queue - blocked requests ordered by priority, FIFO within a priority

use crate::domain::{AdmissionPriority, WorkerId};
use std::cmp::Reverse;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::oneshot;

/// Terminal state of a queued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Admitted,
    /// Waited longer than the configured maximum
    TimedOut,
    /// Caller stopped waiting before a decision was made
    Cancelled,
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionOutcome::Admitted)
    }
}

/// A request resolved by the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub worker_id: WorkerId,
    pub priority: AdmissionPriority,
    pub waited_ms: i64,
    pub outcome: AdmissionOutcome,
}

struct QueuedRequest {
    worker_id: WorkerId,
    priority: AdmissionPriority,
    enqueued_at_ms: i64,
    seq: u64,
    handle: oneshot::Sender<AdmissionOutcome>,
}

impl QueuedRequest {
    /// Fulfil the single-use handle. Returns false if the caller has gone away.
    fn fulfil(self, outcome: AdmissionOutcome, now_ms: i64) -> (Resolved, bool) {
        let delivered = self.handle.send(outcome).is_ok();
        let resolved = Resolved {
            worker_id: self.worker_id,
            priority: self.priority,
            waited_ms: (now_ms - self.enqueued_at_ms).max(0),
            outcome: if delivered {
                outcome
            } else {
                AdmissionOutcome::Cancelled
            },
        };
        (resolved, delivered)
    }
}

/// Queue of pending admission requests
///
/// Each entry is removed exactly when its handle is fulfilled.
#[derive(Default)]
pub struct AdmissionQueue {
    entries: VecDeque<QueuedRequest>,
    next_seq: u64,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request and restore drain order
    pub fn push(
        &mut self,
        worker_id: impl Into<WorkerId>,
        priority: AdmissionPriority,
        now_ms: i64,
    ) -> oneshot::Receiver<AdmissionOutcome> {
        let (tx, rx) = oneshot::channel();
        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.push_back(QueuedRequest {
            worker_id: worker_id.into(),
            priority,
            enqueued_at_ms: now_ms,
            seq,
            handle: tx,
        });
        self.sort();
        rx
    }

    /// Priority descending, then arrival order (`seq` grows under the queue lock)
    fn sort(&mut self) {
        self.entries
            .make_contiguous()
            .sort_by_key(|r| (Reverse(r.priority.ordinal()), r.seq));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (worker_id, priority) pairs in the order they would be admitted
    pub fn snapshot(&self) -> Vec<(WorkerId, AdmissionPriority)> {
        self.entries
            .iter()
            .map(|r| (r.worker_id.clone(), r.priority))
            .collect()
    }

    /// Drop entries whose caller no longer waits on the handle
    pub fn purge_cancelled(&mut self, now_ms: i64) -> Vec<Resolved> {
        let (closed, open): (VecDeque<_>, VecDeque<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|r| r.handle.is_closed());
        self.entries = open;

        closed
            .into_iter()
            .map(|r| r.fulfil(AdmissionOutcome::Cancelled, now_ms).0)
            .collect()
    }

    /// Resolve every entry that has waited longer than `max_wait` with TimedOut
    pub fn expire(&mut self, now_ms: i64, max_wait: Duration) -> Vec<Resolved> {
        let max_wait_ms = max_wait.as_millis() as i64;
        let (expired, alive): (VecDeque<_>, VecDeque<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|r| now_ms - r.enqueued_at_ms > max_wait_ms);
        self.entries = alive;

        expired
            .into_iter()
            .map(|r| r.fulfil(AdmissionOutcome::TimedOut, now_ms).0)
            .collect()
    }

    /// Admit the head of the queue.
    ///
    /// Heads whose caller disappeared are skipped (reported as Cancelled)
    /// so the single admission of a tick is never wasted.
    pub fn admit_head(&mut self, now_ms: i64) -> (Option<Resolved>, Vec<Resolved>) {
        let mut cancelled = Vec::new();
        while let Some(head) = self.entries.pop_front() {
            let (resolved, delivered) = head.fulfil(AdmissionOutcome::Admitted, now_ms);
            if delivered {
                return (Some(resolved), cancelled);
            }
            cancelled.push(resolved);
        }
        (None, cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AdmissionPriority::*;

    #[test]
    fn test_priority_then_fifo_order() {
        let mut queue = AdmissionQueue::new();
        let _a = queue.push("low-1", Low, 1);
        let _b = queue.push("high-1", High, 2);
        let _c = queue.push("low-2", Low, 3);
        let _d = queue.push("normal-1", Normal, 4);
        let _e = queue.push("high-2", High, 5);

        let order: Vec<String> = queue.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["high-1", "high-2", "normal-1", "low-1", "low-2"]);
    }

    #[test]
    fn test_fifo_follows_arrival_when_clock_is_frozen() {
        let mut queue = AdmissionQueue::new();
        let _a = queue.push("first", Normal, 1_000);
        let _b = queue.push("second", Normal, 1_000);
        let _c = queue.push("third", Normal, 1_000);

        let order: Vec<String> = queue.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_admit_head_fulfils_handle_once() {
        let mut queue = AdmissionQueue::new();
        let rx_low = queue.push("low", Low, 0);
        let rx_high = queue.push("high", High, 10);

        let (admitted, cancelled) = queue.admit_head(110);
        let admitted = admitted.unwrap();
        assert!(cancelled.is_empty());
        assert_eq!(admitted.worker_id, "high");
        assert_eq!(admitted.waited_ms, 100);
        assert_eq!(rx_high.await.unwrap(), AdmissionOutcome::Admitted);
        assert_eq!(queue.len(), 1);

        queue.admit_head(200);
        assert_eq!(rx_low.await.unwrap(), AdmissionOutcome::Admitted);
        assert!(queue.is_empty());
        assert!(queue.admit_head(300).0.is_none());
    }

    #[test]
    fn test_admit_head_skips_dropped_callers() {
        let mut queue = AdmissionQueue::new();
        let rx_gone = queue.push("gone", High, 0);
        let mut rx_alive = queue.push("alive", Low, 0);
        drop(rx_gone);

        let (admitted, cancelled) = queue.admit_head(5);
        assert_eq!(admitted.unwrap().worker_id, "alive");
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].outcome, AdmissionOutcome::Cancelled);
        assert_eq!(rx_alive.try_recv().unwrap(), AdmissionOutcome::Admitted);
    }

    #[test]
    fn test_expire_only_old_entries() {
        let mut queue = AdmissionQueue::new();
        let mut rx_old = queue.push("old", Normal, 0);
        let _rx_new = queue.push("new", Normal, 9_000);

        let expired = queue.expire(10_001, Duration::from_secs(10));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].worker_id, "old");
        assert_eq!(rx_old.try_recv().unwrap(), AdmissionOutcome::TimedOut);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_purge_cancelled() {
        let mut queue = AdmissionQueue::new();
        let rx = queue.push("a", Normal, 0);
        let _keep = queue.push("b", Normal, 0);
        drop(rx);

        let purged = queue.purge_cancelled(1);
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].worker_id, "a");
        assert_eq!(queue.snapshot(), vec![("b".to_string(), Normal)]);
    }
}
