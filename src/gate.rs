//! Per-key serialized request admission.
//!
//! Rapid UI interaction (toggling history filters) must never race two
//! historical-data fetches that write into the same shared series state.
//! Each key admits at most one running operation and holds at most one
//! pending one; a submission arriving while another is already pending
//! replaces it, so the latest user intent always wins and intermediate
//! requests are silently dropped.
//!
//! Known hazard, kept on purpose: an already-running operation that gets
//! superseded still runs to completion, and its result may land after the
//! promoted successor's. Consumers overwrite state idempotently, so a rare
//! misordering at worst shows stale data until the next interaction.

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

type GateOp = BoxFuture<'static, ()>;

/// Per-key state. A key absent from the map is idle.
enum KeyState {
    Running,
    RunningWithPending(GateOp),
}

/// Keyed single-flight scheduler with a single-slot, latest-wins pending
/// buffer per key. Cheap to clone; clones share the same queues.
#[derive(Clone, Default)]
pub struct RequestGate {
    queues: Arc<Mutex<FxHashMap<String, KeyState>>>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire-and-forget admission of `op` into the queue named `key`.
    ///
    /// Idle key: starts executing immediately on the tokio runtime.
    /// Running key: parks `op` in the pending slot, overwriting any earlier
    /// parked operation (which is dropped without ever executing).
    pub fn submit<F>(&self, key: &str, op: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.submit_boxed(key.to_string(), Box::pin(op));
    }

    fn submit_boxed(&self, key: String, op: GateOp) {
        let mut queues = self.queues.lock();
        if let Some(state) = queues.get_mut(&key) {
            debug!(%key, "operation parked behind in-flight request");
            *state = KeyState::RunningWithPending(op);
            return;
        }

        debug!(%key, "queue started");
        queues.insert(key.clone(), KeyState::Running);
        drop(queues);

        let gate = self.clone();
        tokio::spawn(async move {
            gate.run_key(key, op).await;
        });
    }

    /// Drive one key: run the current operation, then keep promoting the
    /// pending slot until the queue drains.
    async fn run_key(self, key: String, mut op: GateOp) {
        loop {
            op.await;

            let mut queues = self.queues.lock();
            match queues.remove(&key) {
                Some(KeyState::RunningWithPending(next)) => {
                    debug!(%key, "promoting pending operation");
                    queues.insert(key.clone(), KeyState::Running);
                    op = next;
                }
                _ => {
                    debug!(%key, "queue drained");
                    return;
                }
            }
        }
    }

    /// Whether an operation is currently admitted for `key`.
    pub fn is_busy(&self, key: &str) -> bool {
        self.queues.lock().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, id: u32, delay_ms: u64) -> impl Future<Output = ()> + Send + 'static {
        let log = Arc::clone(log);
        async move {
            sleep(Duration::from_millis(delay_ms)).await;
            log.lock().push(id);
        }
    }

    #[tokio::test]
    async fn three_rapid_submissions_run_first_and_last_only() {
        let gate = RequestGate::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        gate.submit("history", recorder(&log, 1, 50));
        gate.submit("history", recorder(&log, 2, 10));
        gate.submit("history", recorder(&log, 3, 10));

        sleep(Duration::from_millis(300)).await;
        assert_eq!(*log.lock(), vec![1, 3]);
        assert!(!gate.is_busy("history"));
    }

    #[tokio::test]
    async fn sequential_submissions_all_run() {
        let gate = RequestGate::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        gate.submit("k", recorder(&log, 1, 5));
        sleep(Duration::from_millis(100)).await;
        gate.submit("k", recorder(&log, 2, 5));
        sleep(Duration::from_millis(100)).await;

        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let gate = RequestGate::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        gate.submit("cases", recorder(&log, 1, 60));
        gate.submit("deaths", recorder(&log, 2, 10));

        sleep(Duration::from_millis(200)).await;
        // The short operation on the other key finishes first.
        assert_eq!(*log.lock(), vec![2, 1]);
    }

    #[tokio::test]
    async fn pending_promotion_keeps_submission_order() {
        let gate = RequestGate::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        gate.submit("k", recorder(&log, 1, 40));
        gate.submit("k", recorder(&log, 2, 5));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn busy_reflects_queue_lifecycle() {
        let gate = RequestGate::new();
        gate.submit("k", async {
            sleep(Duration::from_millis(40)).await;
        });
        assert!(gate.is_busy("k"));
        sleep(Duration::from_millis(120)).await;
        assert!(!gate.is_busy("k"));
    }
}
