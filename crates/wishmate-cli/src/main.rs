mod telemetry;
mod wiring;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use wishmate_core::app::{PeriodicScanner, TaskProducer, WorkerGroup};
use wishmate_core::config::Config;
use wishmate_core::ports::{Broker, Clock, SystemClock};

use crate::wiring::StartupError;

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing("info");

    match run(Config::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "start-up failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = wiring::connect(&config, Arc::clone(&clock))?;

    // `--demo` seeds one due reminder and one birthday
    if std::env::args().skip(1).any(|arg| arg == "--demo") {
        wiring::seed_demo(&services, clock.now()).await?;
    }

    let workers = WorkerGroup::spawn(
        config.worker_count,
        services.broker.clone(),
        services.dispatcher.clone(),
    );
    let producer = TaskProducer::new(services.broker.clone(), config.io_timeout);
    let scanner = PeriodicScanner::new(
        services.reminders.clone(),
        producer,
        clock,
        config.scanner_config(),
    )
    .spawn();

    info!(
        workers = workers.len(),
        scan_interval_secs = config.scan_interval.as_secs(),
        "wishmate started; press Ctrl-C to stop"
    );

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "cannot listen for Ctrl-C; shutting down");
    }
    info!("shutdown requested");

    if !scanner.shutdown(config.shutdown_grace).await {
        warn!("scanner did not stop cleanly");
    }
    workers.shutdown_and_join().await;
    services.broker.close().await;

    let notifications = services.notifications.len().await;
    match services.broker.counts().await {
        Ok(counts) => info!(
            succeeded = counts.succeeded,
            retry_scheduled = counts.retry_scheduled,
            dead = counts.dead,
            notifications,
            "wishmate stopped"
        ),
        Err(err) => warn!(error = %err, "cannot read final queue counts"),
    }
    Ok(())
}
