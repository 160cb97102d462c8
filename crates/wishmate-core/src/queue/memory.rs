//! In-memory broker implementation.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use super::{DeadLetter, RetryPolicy, TaskRecord, TaskState};
use crate::domain::{BrokerError, ErrorKind, TaskEnvelope, TaskId, TaskType};
use crate::ports::{
    Broker, Clock, Delivery, FailureOutcome, IdGenerator, QueueCounts, SystemClock, UlidGenerator,
};

/// Scheduled task entry for priority queue.
///
/// Reverse ordering so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledTask {
    next_run_at: Instant,
    task_id: TaskId,
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .next_run_at
            .cmp(&self.next_run_at)
            .then_with(|| other.task_id.cmp(&self.task_id))
    }
}

/// Only unsettled tasks keep a record. An acked task is dropped and counted,
/// a dead task lives on as its [`DeadLetter`] copy.
struct BrokerState {
    records: HashMap<TaskId, TaskRecord>,
    ready: VecDeque<TaskId>,
    scheduled: BinaryHeap<ScheduledTask>,
    dead_letters: Vec<DeadLetter>,
    succeeded: usize,
    retry_policy: RetryPolicy,
    closed: bool,
}

impl BrokerState {
    fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            records: HashMap::new(),
            ready: VecDeque::new(),
            scheduled: BinaryHeap::new(),
            dead_letters: Vec::new(),
            succeeded: 0,
            retry_policy,
            closed: false,
        }
    }

    /// Move tasks from scheduled to ready if their time has come.
    fn promote_scheduled_tasks(&mut self) {
        let now = Instant::now();
        while let Some(entry) = self.scheduled.peek() {
            if entry.next_run_at > now {
                break;
            }
            let Some(entry) = self.scheduled.pop() else {
                break;
            };
            if let Some(record) = self.records.get_mut(&entry.task_id)
                && record.state == TaskState::RetryScheduled
            {
                record.requeue();
                self.ready.push_back(entry.task_id);
            }
        }
    }

    fn counts_by_state(&self) -> QueueCounts {
        let mut counts = QueueCounts {
            succeeded: self.succeeded,
            dead: self.dead_letters.len(),
            ..QueueCounts::default()
        };
        for record in self.records.values() {
            match record.state {
                TaskState::Queued => counts.queued += 1,
                TaskState::Running => counts.running += 1,
                TaskState::RetryScheduled => counts.retry_scheduled += 1,
            }
        }
        counts
    }
}

/// Broker kept in process memory.
///
/// Durable only for the life of the process; stands in for a real broker in
/// development and tests while honouring the same at-least-once contract.
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl InMemoryBroker {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self::with_clock(retry_policy, Arc::new(SystemClock))
    }

    pub fn with_clock(retry_policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        let ids = Box::new(UlidGenerator::new(Arc::clone(&clock)));
        Self {
            state: Arc::new(Mutex::new(BrokerState::new(retry_policy))),
            notify: Arc::new(Notify::new()),
            clock,
            ids,
        }
    }

    /// Stop handing out leases and refuse new publishes. Waiting consumers wake up with `None`.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    /// `None` once the task has been acked or dead-lettered.
    pub async fn state_of(&self, task_id: TaskId) -> Option<TaskState> {
        let state = self.state.lock().await;
        state.records.get(&task_id).map(|r| r.state)
    }

    pub async fn attempts_of(&self, task_id: TaskId) -> Option<u32> {
        let state = self.state.lock().await;
        state.records.get(&task_id).map(|r| r.attempts)
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().await.dead_letters.clone()
    }

    /// Envelopes of tasks not yet acked or dead-lettered, in no particular order.
    pub async fn envelopes(&self) -> Vec<TaskEnvelope> {
        let state = self.state.lock().await;
        state.records.values().map(|r| r.envelope.clone()).collect()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, task_type: TaskType, body: Vec<u8>) -> Result<TaskId, BrokerError> {
        let task_id = {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(BrokerError::Closed);
            }
            let task_id = self.ids.generate_task_id();
            let envelope = TaskEnvelope::new(task_id, task_type, body, self.clock.now());
            let record = TaskRecord::new(envelope, state.retry_policy.max_attempts);
            state.records.insert(task_id, record);
            state.ready.push_back(task_id);
            task_id
        };

        self.notify.notify_one();
        Ok(task_id)
    }

    async fn lease(&self) -> Option<Box<dyn Delivery>> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next_wake = {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                state.promote_scheduled_tasks();

                if let Some(task_id) = state.ready.pop_front()
                    && let Some(record) = state.records.get_mut(&task_id)
                {
                    record.start_attempt();
                    let delivery = InMemoryDelivery {
                        task_id,
                        envelope: record.envelope.clone(),
                        attempt: record.attempts,
                        state: Arc::clone(&self.state),
                        notify: Arc::clone(&self.notify),
                    };
                    return Some(Box::new(delivery));
                }

                state.scheduled.peek().map(|entry| entry.next_run_at)
            };

            // publish / retry の通知か、次の retry 時刻まで待つ
            if let Some(wake_time) = next_wake {
                tokio::select! {
                    _ = &mut notified => {},
                    _ = tokio::time::sleep_until(wake_time.into()) => {},
                }
            } else {
                notified.await;
            }
        }
    }

    async fn counts(&self) -> Result<QueueCounts, BrokerError> {
        let state = self.state.lock().await;
        Ok(state.counts_by_state())
    }
}

struct InMemoryDelivery {
    task_id: TaskId,
    envelope: TaskEnvelope,
    attempt: u32,
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn envelope(&self) -> &TaskEnvelope {
        &self.envelope
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state
            .records
            .remove(&self.task_id)
            .ok_or_else(|| BrokerError::UnknownTask(self.task_id.to_string()))?;
        state.succeeded += 1;
        Ok(())
    }

    async fn fail(
        self: Box<Self>,
        error: String,
        kind: ErrorKind,
    ) -> Result<FailureOutcome, BrokerError> {
        let outcome = {
            let mut state = self.state.lock().await;
            let retry_policy = state.retry_policy.clone();
            let record = state
                .records
                .get_mut(&self.task_id)
                .ok_or_else(|| BrokerError::UnknownTask(self.task_id.to_string()))?;

            if !kind.is_retryable() || retry_policy.is_exhausted(record.attempts) {
                let attempts = record.attempts;
                state.records.remove(&self.task_id);
                warn!(
                    task_id = %self.task_id,
                    task_type = %self.envelope.task_type(),
                    attempts,
                    error = %error,
                    "task moved to dead-letter"
                );
                state.dead_letters.push(DeadLetter {
                    envelope: self.envelope.clone(),
                    attempts,
                    error,
                });
                FailureOutcome::DeadLettered
            } else {
                let delay = retry_policy.next_delay(record.attempts);
                let now = Instant::now();
                let next_run_at = now
                    .checked_add(delay)
                    .unwrap_or_else(|| now + RetryPolicy::MAX_DELAY);
                record.schedule_retry(next_run_at, error);
                debug!(
                    task_id = %self.task_id,
                    attempts = record.attempts,
                    delay_ms = delay.as_millis() as u64,
                    "task retry scheduled"
                );
                state.scheduled.push(ScheduledTask {
                    next_run_at,
                    task_id: self.task_id,
                });
                FailureOutcome::RetryScheduled { delay }
            }
        };

        if matches!(outcome, FailureOutcome::RetryScheduled { .. }) {
            self.notify.notify_one();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn broker(max_attempts: u32) -> InMemoryBroker {
        InMemoryBroker::new(RetryPolicy::new(max_attempts, Duration::ZERO))
    }

    async fn lease_now(broker: &InMemoryBroker) -> Box<dyn Delivery> {
        tokio::time::timeout(Duration::from_millis(200), broker.lease())
            .await
            .expect("lease timed out")
            .expect("broker closed")
    }

    #[tokio::test]
    async fn publish_and_counts() {
        let broker = broker(3);
        broker
            .publish(TaskType::new("mail:deliver"), b"{}".to_vec())
            .await
            .unwrap();

        let counts = broker.counts().await.unwrap();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.running, 0);
    }

    #[tokio::test]
    async fn lease_transitions_to_running_and_ack_succeeds() {
        let broker = broker(3);
        let id = broker
            .publish(TaskType::new("mail:deliver"), b"{}".to_vec())
            .await
            .unwrap();

        let delivery = lease_now(&broker).await;
        assert_eq!(delivery.envelope().task_id(), id);
        assert_eq!(delivery.envelope().task_type().as_str(), "mail:deliver");
        assert_eq!(delivery.attempt(), 1);
        assert_eq!(broker.counts().await.unwrap().running, 1);

        delivery.ack().await.unwrap();
        assert_eq!(broker.state_of(id).await, None);
        assert_eq!(broker.counts().await.unwrap().succeeded, 1);
    }

    #[tokio::test]
    async fn settled_tasks_release_their_records() {
        let broker = broker(1);
        for i in 0..100 {
            broker
                .publish(TaskType::new("mail:deliver"), b"{}".to_vec())
                .await
                .unwrap();
            let d = lease_now(&broker).await;
            if i % 10 == 0 {
                d.fail("refused".to_string(), ErrorKind::Permanent).await.unwrap();
            } else {
                d.ack().await.unwrap();
            }
        }

        assert!(broker.envelopes().await.is_empty());
        let counts = broker.counts().await.unwrap();
        assert_eq!((counts.succeeded, counts.dead), (90, 10));
        assert_eq!(broker.dead_letters().await.len(), 10);
    }

    #[tokio::test]
    async fn huge_backoff_does_not_overflow_the_clock() {
        let broker = InMemoryBroker::new(RetryPolicy::new(3, Duration::MAX));
        broker
            .publish(TaskType::new("mail:deliver"), b"{}".to_vec())
            .await
            .unwrap();

        let d = lease_now(&broker).await;
        let outcome = d.fail("later".to_string(), ErrorKind::Transient).await.unwrap();
        assert_eq!(
            outcome,
            FailureOutcome::RetryScheduled {
                delay: RetryPolicy::MAX_DELAY
            }
        );
        assert_eq!(broker.counts().await.unwrap().retry_scheduled, 1);
    }

    #[tokio::test]
    async fn transient_failure_is_redelivered() {
        let broker = broker(3);
        let id = broker
            .publish(TaskType::new("mail:deliver"), b"{}".to_vec())
            .await
            .unwrap();

        let first = lease_now(&broker).await;
        let outcome = first
            .fail("smtp down".to_string(), ErrorKind::Transient)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FailureOutcome::RetryScheduled {
                delay: Duration::ZERO
            }
        );

        let second = lease_now(&broker).await;
        assert_eq!(second.envelope().task_id(), id);
        assert_eq!(second.attempt(), 2);
        assert_eq!(broker.attempts_of(id).await, Some(2));
    }

    #[tokio::test]
    async fn exhausted_attempts_dead_letter() {
        let broker = broker(2);
        let id = broker
            .publish(TaskType::new("mail:deliver"), b"{}".to_vec())
            .await
            .unwrap();

        for _ in 0..2 {
            let d = lease_now(&broker).await;
            d.fail("boom".to_string(), ErrorKind::Transient).await.unwrap();
        }

        assert_eq!(broker.state_of(id).await, None);
        let dead = broker.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].attempts, 2);
        assert_eq!(dead[0].error, "boom");
    }

    #[tokio::test]
    async fn permanent_failure_skips_retries() {
        let broker = broker(5);
        let id = broker
            .publish(TaskType::new("unknown:type"), b"{}".to_vec())
            .await
            .unwrap();

        let d = lease_now(&broker).await;
        let outcome = d
            .fail("no handler".to_string(), ErrorKind::Permanent)
            .await
            .unwrap();

        assert_eq!(outcome, FailureOutcome::DeadLettered);
        assert_eq!(broker.dead_letters().await[0].envelope.task_id(), id);
        assert_eq!(broker.dead_letters().await[0].attempts, 1);
        assert_eq!(broker.counts().await.unwrap().dead, 1);
    }

    #[tokio::test]
    async fn backoff_delays_redelivery() {
        let broker = InMemoryBroker::new(RetryPolicy::new(3, Duration::from_millis(50)));
        broker
            .publish(TaskType::new("mail:deliver"), b"{}".to_vec())
            .await
            .unwrap();

        let d = lease_now(&broker).await;
        d.fail("later".to_string(), ErrorKind::Transient).await.unwrap();
        assert_eq!(broker.counts().await.unwrap().retry_scheduled, 1);

        let start = Instant::now();
        let again = lease_now(&broker).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(again.attempt(), 2);
    }

    #[tokio::test]
    async fn publish_wakes_waiting_lease() {
        let broker = Arc::new(broker(3));

        let waiter = tokio::spawn({
            let broker = Arc::clone(&broker);
            async move { broker.lease().await.map(|d| d.envelope().task_type().clone()) }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        broker
            .publish(TaskType::new("notification:deliver"), b"{}".to_vec())
            .await
            .unwrap();

        let leased = waiter.await.unwrap();
        assert_eq!(leased, Some(TaskType::new("notification:deliver")));
    }

    #[tokio::test]
    async fn close_releases_waiters_and_rejects_publish() {
        let broker = Arc::new(broker(3));

        let waiter = tokio::spawn({
            let broker = Arc::clone(&broker);
            async move { broker.lease().await.is_none() }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.close().await;

        assert!(waiter.await.unwrap());
        let err = broker
            .publish(TaskType::new("mail:deliver"), Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err, BrokerError::Closed);
    }
}
