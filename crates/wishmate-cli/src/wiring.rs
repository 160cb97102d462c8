//! Collaborator wiring. Anything that cannot be connected aborts start-up.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use wishmate_core::app::{BuildError, Dispatcher, DispatcherBuilder, EmailHandler, NotificationHandler};
use wishmate_core::config::{Config, MEMORY_URL};
use wishmate_core::domain::{
    EmailDelivery, NewReminder, NotificationDelivery, StoreError, TaskPayload, UserId,
};
use wishmate_core::impls::{InMemoryNotificationStore, InMemoryReminderStore, LogTransport, UserProfile};
use wishmate_core::ports::{Clock, ReminderStore};
use wishmate_core::queue::InMemoryBroker;
use wishmate_core::typed::RegistryError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("unsupported DATABASE_URL {0:?}: only memory:// is available")]
    UnsupportedDatabase(String),

    #[error("unsupported BROKER_URL {0:?}: only memory:// is available")]
    UnsupportedBroker(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("demo data: {0}")]
    Seed(#[from] StoreError),
}

pub struct Services {
    pub broker: Arc<InMemoryBroker>,
    pub reminders: Arc<InMemoryReminderStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub dispatcher: Arc<Dispatcher>,
}

pub fn connect(config: &Config, clock: Arc<dyn Clock>) -> Result<Services, StartupError> {
    if config.database_url != MEMORY_URL {
        return Err(StartupError::UnsupportedDatabase(config.database_url.clone()));
    }
    if config.broker_url != MEMORY_URL {
        return Err(StartupError::UnsupportedBroker(config.broker_url.clone()));
    }

    let broker = Arc::new(InMemoryBroker::with_clock(config.retry_policy(), Arc::clone(&clock)));
    let reminders = Arc::new(InMemoryReminderStore::new());
    let notifications = Arc::new(InMemoryNotificationStore::with_clock(clock));
    let transport = Arc::new(LogTransport::with_templates(["reminder_mail", "birthday_mail"]));

    let dispatcher = DispatcherBuilder::new()
        .register::<NotificationDelivery, _>(NotificationHandler::new(
            notifications.clone(),
            config.io_timeout,
        ))?
        .register::<EmailDelivery, _>(EmailHandler::new(transport, config.io_timeout))?
        .expect_tasks(&TaskPayload::ALL_TYPES)
        .build()?;

    info!(
        handlers = ?dispatcher.registry().registered_types(),
        "collaborators connected"
    );

    Ok(Services {
        broker,
        reminders,
        notifications,
        dispatcher: Arc::new(dispatcher),
    })
}

/// One reminder due now and one user whose birthday is today.
pub async fn seed_demo(services: &Services, now: DateTime<Utc>) -> Result<(), StartupError> {
    let reminder = services
        .reminders
        .create_reminder(NewReminder {
            user_id: UserId::new(1),
            email: "ada@example.com".to_string(),
            title: "Bob's birthday is coming".to_string(),
            body: "Bob added 3 items to his wishlist".to_string(),
            kind: "alert".to_string(),
            execute_at: Some(now),
        })
        .await?;

    services
        .reminders
        .add_user(UserProfile {
            user_id: UserId::new(2),
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            birth_date: now.date_naive(),
        })
        .await;

    info!(reminder_id = %reminder.id, "demo data seeded");
    Ok(())
}
