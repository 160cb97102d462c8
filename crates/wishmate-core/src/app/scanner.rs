//! PeriodicScanner - 定期的に due なリマインダーと誕生日を探してタスク化する
//!
//! # 1 tick の流れ
//! 1. `now` を Clock から取る
//! 2. due reminders を問い合わせ、reminder ごとに notification + email を enqueue し、
//!    `mark_dispatched`
//! 3. due birthdays を問い合わせ、誕生日ごとに notification + email を enqueue
//!    （ストア側の状態は持たない）
//!
//! 2 と 3 は互いに独立。片方のクエリが失敗してももう片方は処理され、結果は
//! [`IncompleteScan`] にまとめて返る。
//!
//! 1 件の失敗はログに出して次へ進む。enqueue と mark は非トランザクションなので
//! at-least-once（重複はあり得る、欠落はしない）。
//!
//! # 並行性
//! - scan は loop の中で inline に実行するので 2 つの scan が重なることはない
//! - 間に合わなかった tick は捨てる（`MissedTickBehavior::Skip`）
//! - shutdown は tick の合間にだけ効く。実行中の tick は `ScannerHandle::shutdown`
//!   の猶予時間内なら最後まで走る

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::fanout::{birthday_payloads, reminder_payloads};
use super::producer::TaskProducer;
use crate::domain::{BirthdayEvent, Reminder, StoreError, UserId};
use crate::ports::{Clock, ReminderStore};

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub interval: Duration,
    /// Bound on each store call.
    pub io_timeout: Duration,
    /// Delay the first tick until the next wall-clock minute.
    pub align_to_minute: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            io_timeout: Duration::from_secs(5),
            align_to_minute: true,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub due_reminders: usize,
    pub due_birthdays: usize,
    /// Tasks accepted by the broker.
    pub enqueued: usize,
    /// Failed enqueue / mark calls and items that could not be turned into tasks.
    pub failed: usize,
    /// Reminders moved to `dispatched`.
    pub marked: usize,
    /// Birthdays already enqueued earlier today.
    pub skipped_birthdays: usize,
}

/// A due query failed, so its half of the tick was skipped.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("due reminder query failed: {0}")]
    Reminders(#[source] StoreError),

    #[error("due birthday query failed: {0}")]
    Birthdays(#[source] StoreError),
}

/// At least one due query failed. `report` holds what the other half did.
#[derive(Debug, Error)]
#[error("scan tick incomplete: {}", summarize(.failures))]
pub struct IncompleteScan {
    pub report: ScanReport,
    pub failures: Vec<ScanError>,
}

fn summarize(failures: &[ScanError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Birthdays already handed to the broker on `day`.
///
/// Process-local only: after a restart the day's birthdays go out once more.
#[derive(Debug, Default)]
struct BirthdayLedger {
    day: Option<NaiveDate>,
    sent: HashSet<UserId>,
}

impl BirthdayLedger {
    fn roll_to(&mut self, today: NaiveDate) {
        if self.day != Some(today) {
            self.day = Some(today);
            self.sent.clear();
        }
    }
}

pub struct PeriodicScanner {
    store: Arc<dyn ReminderStore>,
    producer: TaskProducer,
    clock: Arc<dyn Clock>,
    config: ScannerConfig,
    birthdays: BirthdayLedger,
}

impl PeriodicScanner {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        producer: TaskProducer,
        clock: Arc<dyn Clock>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            store,
            producer,
            clock,
            config,
            birthdays: BirthdayLedger::default(),
        }
    }

    /// Run one tick.
    pub async fn scan_once(&mut self) -> Result<ScanReport, IncompleteScan> {
        let now = self.clock.now();
        let mut report = ScanReport::default();
        let mut failures = Vec::new();

        match self.bounded(self.store.get_due_reminders(now)).await {
            Ok(reminders) => {
                report.due_reminders = reminders.len();
                for reminder in &reminders {
                    self.dispatch_reminder(reminder, &mut report).await;
                }
            }
            Err(err) => failures.push(ScanError::Reminders(err)),
        }

        match self.bounded(self.store.get_due_birthdays(now)).await {
            Ok(birthdays) => {
                report.due_birthdays = birthdays.len();
                self.birthdays.roll_to(now.date_naive());
                for birthday in &birthdays {
                    if self.birthdays.sent.contains(&birthday.user_id) {
                        report.skipped_birthdays += 1;
                        continue;
                    }
                    if self.dispatch_birthday(birthday, &mut report).await {
                        self.birthdays.sent.insert(birthday.user_id);
                    }
                }
            }
            Err(err) => failures.push(ScanError::Birthdays(err)),
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(IncompleteScan { report, failures })
        }
    }

    /// Enqueue both tasks, then mark the reminder dispatched.
    ///
    /// A transient enqueue failure leaves the reminder pending for the next
    /// tick. A reminder that can never become a valid task is marked anyway.
    async fn dispatch_reminder(&self, reminder: &Reminder, report: &mut ScanReport) {
        let payloads = match reminder_payloads(reminder) {
            Ok(payloads) => payloads,
            Err(err) => {
                error!(
                    reminder_id = %reminder.id,
                    user_id = %reminder.user_id,
                    error = %err,
                    "reminder cannot become a task; dropping it"
                );
                report.failed += 1;
                self.mark_dispatched(reminder, report).await;
                return;
            }
        };

        let mut retry_next_tick = false;
        for payload in &payloads {
            match self.producer.enqueue(payload).await {
                Ok(_) => report.enqueued += 1,
                Err(err) => {
                    warn!(
                        reminder_id = %reminder.id,
                        user_id = %reminder.user_id,
                        task_type = %payload.task_type(),
                        error = %err,
                        "enqueue failed"
                    );
                    report.failed += 1;
                    retry_next_tick |= err.kind().is_retryable();
                }
            }
        }

        if !retry_next_tick {
            self.mark_dispatched(reminder, report).await;
        }
    }

    async fn mark_dispatched(&self, reminder: &Reminder, report: &mut ScanReport) {
        match self.bounded(self.store.mark_dispatched(reminder.id)).await {
            Ok(()) => report.marked += 1,
            Err(err) => {
                warn!(reminder_id = %reminder.id, error = %err, "mark dispatched failed");
                report.failed += 1;
            }
        }
    }

    /// Returns false when a transient failure should be retried next tick.
    async fn dispatch_birthday(&self, birthday: &BirthdayEvent, report: &mut ScanReport) -> bool {
        let payloads = match birthday_payloads(birthday) {
            Ok(payloads) => payloads,
            Err(err) => {
                error!(user_id = %birthday.user_id, error = %err, "birthday cannot become a task");
                report.failed += 1;
                return true;
            }
        };

        let mut done = true;
        for payload in &payloads {
            match self.producer.enqueue(payload).await {
                Ok(_) => report.enqueued += 1,
                Err(err) => {
                    warn!(
                        user_id = %birthday.user_id,
                        task_type = %payload.task_type(),
                        error = %err,
                        "birthday enqueue failed"
                    );
                    report.failed += 1;
                    done &= !err.kind().is_retryable();
                }
            }
        }
        done
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let limit = self.config.io_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| StoreError::Timeout(limit))?
    }

    /// Tick until `shutdown` flips to true (or its sender is dropped).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if self.config.align_to_minute {
            let delay = start_delay(self.clock.now());
            info!(delay_ms = delay.as_millis() as u64, "scanner waiting for the next minute");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    info!("scanner stopped before its first tick");
                    return;
                }
            }
        }

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            info!("scan tick started");
            match self.scan_once().await {
                Ok(report) => info!(
                    due_reminders = report.due_reminders,
                    due_birthdays = report.due_birthdays,
                    enqueued = report.enqueued,
                    failed = report.failed,
                    marked = report.marked,
                    "scan tick finished"
                ),
                Err(err) => error!(
                    error = %err,
                    enqueued = err.report.enqueued,
                    failed = err.report.failed,
                    marked = err.report.marked,
                    "scan tick incomplete"
                ),
            }
        }

        info!("scanner stopped");
    }

    pub fn spawn(self) -> ScannerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        ScannerHandle { shutdown_tx, join }
    }
}

/// Handle of a spawned scanner.
pub struct ScannerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ScannerHandle {
    /// Stop scheduling ticks and wait up to `grace` for an in-flight tick.
    /// Returns false if the tick had to be aborted.
    pub async fn shutdown(self, grace: Duration) -> bool {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);

        let mut join = self.join;
        match tokio::time::timeout(grace, &mut join).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                error!(error = %err, "scanner task failed");
                false
            }
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "scan tick outlived grace period; aborting");
                join.abort();
                false
            }
        }
    }
}

/// Time from `now` to the next wall-clock minute boundary (zero when on it).
pub fn start_delay(now: DateTime<Utc>) -> Duration {
    let into_minute = now.timestamp_millis().rem_euclid(60_000);
    if into_minute == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis((60_000 - into_minute) as u64)
    }
}
