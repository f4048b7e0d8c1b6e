//! Serialized background execution of trigger requests
//!
//! The sample path submits labels through a [`TriggerHandle`] without ever
//! waiting. A single task runs the trigger, so requests execute one at a
//! time. Pending requests live in a latest-value slot: while the trigger is
//! busy each new label overwrites the one waiting, so the next start is
//! always the newest label. Overwritten labels are counted as superseded.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ActivityTrigger;

/// Label waiting for the worker, tagged with its submission number
type Pending = Option<(u64, String)>;

/// Outcome counters returned when the worker shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Requests that completed successfully
    pub started: u64,
    /// Requests whose trigger returned an error
    pub failed: u64,
    /// Pending requests replaced by a newer one before running
    pub superseded: u64,
}

/// Cheap, cloneable submission side of a [`TriggerWorker`].
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: Arc<watch::Sender<Pending>>,
}

impl TriggerHandle {
    /// Hand a label to the worker without waiting.
    ///
    /// Replaces any label still waiting to run. Returns `false` only if the
    /// worker has stopped.
    pub fn submit(&self, label: impl Into<String>) -> bool {
        if self.tx.is_closed() {
            tracing::warn!("Trigger worker stopped, dropping request");
            return false;
        }

        let label = label.into();
        self.tx.send_modify(|pending| {
            let seq = pending.as_ref().map_or(1, |(seq, _)| seq + 1);
            *pending = Some((seq, label));
        });
        true
    }
}

/// Background task owning an [`ActivityTrigger`].
pub struct TriggerWorker {
    trigger: Arc<dyn ActivityTrigger>,
    rx: watch::Receiver<Pending>,
    stats: WorkerStats,
}

impl TriggerWorker {
    /// Spawn a worker for `trigger`.
    ///
    /// The worker runs until every [`TriggerHandle`] is dropped and the last
    /// pending label has run, then yields its counters through the join
    /// handle.
    pub fn spawn(trigger: Arc<dyn ActivityTrigger>) -> (TriggerHandle, JoinHandle<WorkerStats>) {
        let (tx, rx) = watch::channel(None);
        let worker = Self {
            trigger,
            rx,
            stats: WorkerStats::default(),
        };

        (TriggerHandle { tx: Arc::new(tx) }, tokio::spawn(worker.run()))
    }

    async fn run(mut self) -> WorkerStats {
        tracing::debug!(trigger = self.trigger.name(), "Trigger worker started");
        let mut last_seq = 0;

        // An unseen label is still delivered after the last handle is dropped
        while self.rx.changed().await.is_ok() {
            let Some((seq, label)) = self.rx.borrow_and_update().clone() else {
                continue;
            };

            let skipped = seq - last_seq - 1;
            if skipped > 0 {
                tracing::debug!(skipped, label = %label, "Superseded pending trigger requests");
                self.stats.superseded += skipped;
            }
            last_seq = seq;

            match self.trigger.start(&label).await {
                Ok(()) => {
                    self.stats.started += 1;
                    tracing::info!(trigger = self.trigger.name(), label = %label, "Trigger completed");
                }
                Err(e) => {
                    self.stats.failed += 1;
                    tracing::warn!(trigger = self.trigger.name(), label = %label, error = %e, "Trigger failed");
                }
            }
        }

        tracing::debug!(
            started = self.stats.started,
            failed = self.stats.failed,
            superseded = self.stats.superseded,
            "Trigger worker stopped"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::{Notify, Semaphore};

    use crate::trigger::{TriggerError, TriggerResult};

    /// Records labels and blocks each call until a permit is released.
    struct GatedTrigger {
        calls: Mutex<Vec<String>>,
        entered: Notify,
        gate: Semaphore,
    }

    impl GatedTrigger {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                entered: Notify::new(),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl ActivityTrigger for GatedTrigger {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn start(&self, label: &str) -> TriggerResult<()> {
            self.calls.lock().unwrap().push(label.to_string());
            self.entered.notify_one();
            self.gate.acquire().await.unwrap().forget();
            Ok(())
        }

        async fn stop(&self) -> TriggerResult<()> {
            Ok(())
        }
    }

    struct FailingTrigger;

    #[async_trait]
    impl ActivityTrigger for FailingTrigger {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn start(&self, _label: &str) -> TriggerResult<()> {
            Err(TriggerError::Api {
                status: 500,
                message: "boom".to_string(),
            })
        }

        async fn stop(&self) -> TriggerResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_requests_run_in_order() {
        let trigger = Arc::new(GatedTrigger::new());
        trigger.gate.add_permits(16);
        let (handle, join) = TriggerWorker::spawn(trigger.clone());

        for label in ["Project 1", "Project 2", "Project 3"] {
            assert!(handle.submit(label));
            trigger.entered.notified().await;
        }
        drop(handle);

        let stats = join.await.unwrap();
        assert_eq!(stats.started, 3);
        assert_eq!(
            *trigger.calls.lock().unwrap(),
            vec!["Project 1", "Project 2", "Project 3"]
        );
    }

    #[tokio::test]
    async fn test_backlog_coalesces_to_newest() {
        let trigger = Arc::new(GatedTrigger::new());
        let (handle, join) = TriggerWorker::spawn(trigger.clone());

        assert!(handle.submit("a"));
        trigger.entered.notified().await;

        // Worker is blocked inside "a"; these wait behind it
        assert!(handle.submit("b"));
        assert!(handle.submit("c"));

        trigger.gate.add_permits(16);
        drop(handle);

        let stats = join.await.unwrap();
        assert_eq!(*trigger.calls.lock().unwrap(), vec!["a", "c"]);
        assert_eq!(
            stats,
            WorkerStats {
                started: 2,
                failed: 0,
                superseded: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_busy_trigger_always_starts_newest_label() {
        let trigger = Arc::new(GatedTrigger::new());
        let (handle, join) = TriggerWorker::spawn(trigger.clone());

        assert!(handle.submit("Project 1"));
        trigger.entered.notified().await;

        // Faces keep changing while the first request is stuck
        for label in ["Project 2", "Project 3", "Project 4", "Project 5"] {
            assert!(handle.submit(label));
        }

        trigger.gate.add_permits(16);
        drop(handle);

        let stats = join.await.unwrap();
        assert_eq!(*trigger.calls.lock().unwrap(), vec!["Project 1", "Project 5"]);
        assert_eq!(stats.superseded, 3);
        assert_eq!(stats.started, 2);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let (handle, join) = TriggerWorker::spawn(Arc::new(FailingTrigger));
        assert!(handle.submit("x"));
        drop(handle);

        let stats = join.await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.started, 0);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown() {
        let (handle, join) = TriggerWorker::spawn(Arc::new(FailingTrigger));
        join.abort();
        let _ = join.await;
        assert!(!handle.submit("late"));
    }
}
