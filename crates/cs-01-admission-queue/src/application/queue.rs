//! Admission Queue
//!
//! A single priority-ordered wait queue with two admission gates: HIGH tasks
//! are always enqueued, LOW tasks are refused once the queue is full.
//! Execution slots are handed directly from a finishing task to the next
//! waiter (HIGH before LOW, FIFO within a class), so no waiter can be
//! overtaken by a newcomer.

use crate::config::QueueConfig;
use crate::domain::errors::QueueError;
use crate::domain::value_objects::Priority;
use catalyst_telemetry::{QUEUE_BEING_EXECUTED, QUEUE_PENDING, QUEUE_REJECTED};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

type Waiter = oneshot::Sender<Slot>;

#[derive(Default)]
struct QueueState {
    running: usize,
    high: VecDeque<Waiter>,
    low: VecDeque<Waiter>,
}

impl QueueState {
    fn pending(&self) -> usize {
        self.high.len() + self.low.len()
    }

    /// Drop waiters whose caller already gave up.
    fn purge_abandoned(&mut self) {
        self.high.retain(|waiter| !waiter.is_closed());
        self.low.retain(|waiter| !waiter.is_closed());
    }

    fn next_waiter(&mut self) -> Option<Waiter> {
        self.high.pop_front().or_else(|| self.low.pop_front())
    }

    fn publish_gauges(&self) {
        QUEUE_BEING_EXECUTED.set(self.running as f64);
        QUEUE_PENDING.set(self.pending() as f64);
    }
}

struct Shared {
    state: Mutex<QueueState>,
}

impl Shared {
    /// Hand the freed slot to the next live waiter, or give it back.
    fn release(self: &Arc<Self>) {
        let mut state = self.state.lock();
        while let Some(waiter) = state.next_waiter() {
            match waiter.send(Slot::new(Arc::clone(self))) {
                Ok(()) => {
                    state.publish_gauges();
                    return;
                }
                // Waiter timed out between purge and hand-off
                Err(mut slot) => slot.disarm(),
            }
        }
        state.running = state.running.saturating_sub(1);
        state.publish_gauges();
    }
}

/// One execution slot. Dropping it releases the slot to the queue.
struct Slot {
    shared: Option<Arc<Shared>>,
}

impl Slot {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared: Some(shared),
        }
    }

    fn disarm(&mut self) {
        self.shared = None;
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release();
        }
    }
}

/// Bounded, priority-aware concurrency gate.
///
/// Cloning is cheap; clones share the same slots and waiters.
#[derive(Clone)]
pub struct AdmissionQueue {
    config: QueueConfig,
    shared: Arc<Shared>,
}

impl AdmissionQueue {
    /// Create a new queue with custom config
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Number of tasks currently holding a slot.
    pub fn being_executed(&self) -> usize {
        self.shared.state.lock().running
    }

    /// Number of live tasks waiting for a slot.
    pub fn pending_in_queue(&self) -> usize {
        let mut state = self.shared.state.lock();
        state.purge_abandoned();
        state.pending()
    }

    /// Run `task` once a slot is free.
    ///
    /// The task is spawned onto the runtime while holding its slot, so a
    /// caller that times out (or is dropped) does not cancel work that has
    /// already started; the slot is released when the task finishes.
    pub async fn submit<F>(&self, priority: Priority, task: F) -> Result<F::Output, QueueError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let deadline = Instant::now() + self.config.timeout;
        let slot = self.acquire(priority, deadline).await?;

        let handle = tokio::spawn(async move {
            let _slot = slot;
            task.await
        });

        match timeout_at(deadline, handle).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(join_error)) => {
                warn!(%priority, error = %join_error, "Admitted task failed");
                Err(QueueError::TaskFailed(join_error.to_string()))
            }
            Err(_) => Err(self.timed_out(priority, "running")),
        }
    }

    async fn acquire(&self, priority: Priority, deadline: Instant) -> Result<Slot, QueueError> {
        let receiver = {
            let mut state = self.shared.state.lock();
            if state.running < self.config.max_concurrency {
                state.running += 1;
                state.publish_gauges();
                return Ok(Slot::new(Arc::clone(&self.shared)));
            }

            state.purge_abandoned();
            let pending = state.pending();
            if priority == Priority::Low && pending >= self.config.max_queued {
                QUEUE_REJECTED.with_label_values(&["saturated"]).inc();
                debug!(
                    pending,
                    max_queued = self.config.max_queued,
                    "Refusing low priority task, queue saturated"
                );
                return Err(QueueError::Saturated {
                    pending,
                    max_queued: self.config.max_queued,
                });
            }

            let (sender, receiver) = oneshot::channel();
            match priority {
                Priority::High => state.high.push_back(sender),
                Priority::Low => state.low.push_back(sender),
            }
            state.publish_gauges();
            receiver
        };

        match timeout_at(deadline, receiver).await {
            Ok(Ok(slot)) => Ok(slot),
            Ok(Err(_)) => Err(QueueError::TaskFailed(
                "admission queue dropped waiter".to_string(),
            )),
            Err(_) => {
                {
                    let mut state = self.shared.state.lock();
                    state.purge_abandoned();
                    state.publish_gauges();
                }
                Err(self.timed_out(priority, "waiting"))
            }
        }
    }

    fn timed_out(&self, priority: Priority, phase: &'static str) -> QueueError {
        QUEUE_REJECTED.with_label_values(&["timeout"]).inc();
        warn!(
            %priority,
            phase,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Admitted task exceeded timeout"
        );
        QueueError::Timeout {
            timeout: self.config.timeout,
        }
    }
}

impl Default for AdmissionQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}
