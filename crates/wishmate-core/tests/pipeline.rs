use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use wishmate_core::app::{
    DispatcherBuilder, EmailHandler, NotificationHandler, PeriodicScanner, ScannerConfig,
    TaskProducer, WorkerGroup,
};
use wishmate_core::domain::{
    EmailDelivery, NewReminder, NotificationDelivery, NotificationStatus, ReminderStatus,
    TaskPayload, UserId,
};
use wishmate_core::impls::{InMemoryNotificationStore, InMemoryReminderStore, LogTransport, UserProfile};
use wishmate_core::ports::{Broker, Clock, FixedClock, NotificationStore, ReminderStore};
use wishmate_core::queue::{InMemoryBroker, RetryPolicy};

const TIMEOUT: Duration = Duration::from_secs(1);

struct Pipeline {
    clock: Arc<FixedClock>,
    reminders: Arc<InMemoryReminderStore>,
    notifications: Arc<InMemoryNotificationStore>,
    transport: Arc<LogTransport>,
    broker: Arc<InMemoryBroker>,
    scanner: PeriodicScanner,
    workers: WorkerGroup,
}

fn pipeline(templates: &[&str]) -> Pipeline {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(FixedClock::new(now));
    let reminders = Arc::new(InMemoryReminderStore::new());
    let notifications = Arc::new(InMemoryNotificationStore::with_clock(clock.clone()));
    let transport = Arc::new(LogTransport::with_templates(templates.iter().copied()));
    let broker = Arc::new(InMemoryBroker::with_clock(
        RetryPolicy::new(3, Duration::ZERO),
        clock.clone(),
    ));

    let dispatcher = DispatcherBuilder::new()
        .register::<NotificationDelivery, _>(NotificationHandler::new(notifications.clone(), TIMEOUT))
        .unwrap()
        .register::<EmailDelivery, _>(EmailHandler::new(transport.clone(), TIMEOUT))
        .unwrap()
        .expect_tasks(&TaskPayload::ALL_TYPES)
        .build()
        .unwrap();
    let workers = WorkerGroup::spawn(2, broker.clone(), Arc::new(dispatcher));

    let scanner = PeriodicScanner::new(
        reminders.clone(),
        TaskProducer::new(broker.clone(), TIMEOUT),
        clock.clone(),
        ScannerConfig {
            interval: Duration::from_millis(10),
            io_timeout: TIMEOUT,
            align_to_minute: false,
        },
    );

    Pipeline {
        clock,
        reminders,
        notifications,
        transport,
        broker,
        scanner,
        workers,
    }
}

/// Wait until the broker has nothing queued, running or waiting for a retry.
async fn drain(broker: &InMemoryBroker) {
    for _ in 0..200 {
        let counts = broker.counts().await.unwrap();
        if counts.queued == 0 && counts.running == 0 && counts.retry_scheduled == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("broker did not drain: {:?}", broker.counts().await.unwrap());
}

#[tokio::test]
async fn due_reminder_becomes_notification_and_email() {
    let mut p = pipeline(&["reminder_mail", "birthday_mail"]);
    let now = p.clock.now();
    let reminder = p
        .reminders
        .create_reminder(NewReminder {
            user_id: UserId::new(1),
            email: "ada@example.com".to_string(),
            title: "Bob's birthday is coming".to_string(),
            body: "Bob added a bike to his wishlist".to_string(),
            kind: "alert".to_string(),
            execute_at: Some(now - chrono::Duration::minutes(1)),
        })
        .await
        .unwrap();

    let report = p.scanner.scan_once().await.unwrap();
    assert_eq!(report.enqueued, 2);
    drain(&p.broker).await;

    let inbox = p
        .notifications
        .list_user_notifications(UserId::new(1))
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].title, "Bob's birthday is coming");
    assert_eq!(inbox[0].status, NotificationStatus::Unread);
    assert_eq!(inbox[0].created_at, now);

    let sent = p.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].template, "reminder_mail");
    assert_eq!(sent[0].vars["body"], "Bob added a bike to his wishlist");

    assert_eq!(
        p.reminders.reminder(reminder.id).await.unwrap().status,
        ReminderStatus::Dispatched
    );

    // nothing is due any more
    assert_eq!(p.scanner.scan_once().await.unwrap().enqueued, 0);
    p.workers.shutdown_and_join().await;
}

#[tokio::test]
async fn birthday_reaches_the_user_once() {
    let mut p = pipeline(&["reminder_mail", "birthday_mail"]);
    p.reminders
        .add_user(UserProfile {
            user_id: UserId::new(2),
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1991, 3, 1).unwrap(),
        })
        .await;

    p.scanner.scan_once().await.unwrap();
    p.clock.advance(chrono::Duration::minutes(1));
    p.scanner.scan_once().await.unwrap();
    drain(&p.broker).await;

    let inbox = p
        .notifications
        .list_user_notifications(UserId::new(2))
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, "birthday");

    let sent = p.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Birthday");
    assert_eq!(sent[0].vars["name"], "Bob");
    p.workers.shutdown_and_join().await;
}

#[tokio::test]
async fn refused_email_is_dead_lettered_while_notification_succeeds() {
    // the transport does not know the reminder template
    let mut p = pipeline(&["birthday_mail"]);
    let now = p.clock.now();
    p.reminders
        .create_reminder(NewReminder {
            user_id: UserId::new(1),
            email: "ada@example.com".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            kind: "alert".to_string(),
            execute_at: Some(now),
        })
        .await
        .unwrap();

    p.scanner.scan_once().await.unwrap();
    drain(&p.broker).await;

    let counts = p.broker.counts().await.unwrap();
    assert_eq!(counts.succeeded, 1);
    assert_eq!(counts.dead, 1);

    let dead = p.broker.dead_letters().await;
    assert_eq!(dead[0].envelope.task_type().as_str(), "mail:deliver");
    assert_eq!(dead[0].attempts, 1);
    assert_eq!(p.notifications.len().await, 1);
    p.workers.shutdown_and_join().await;
}
