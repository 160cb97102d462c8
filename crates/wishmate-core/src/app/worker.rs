use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::dispatcher::Dispatcher;
use crate::ports::Broker;

/// Consumer worker group handle.
/// - `request_shutdown()` で全ワーカーが新しい lease を取らなくなる
/// - ブローカーが close されても（lease が None）ワーカーは終了する
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(n: usize, broker: Arc<dyn Broker>, dispatcher: Arc<Dispatcher>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = (0..n)
            .map(|worker_id| {
                let broker = Arc::clone(&broker);
                let dispatcher = Arc::clone(&dispatcher);
                let rx = shutdown_rx.clone();
                tokio::spawn(worker_loop(worker_id, broker, dispatcher, rx))
            })
            .collect();

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// In-flight handlers run to completion; only new leases stop.
    pub fn request_shutdown(&self) {
        // receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(err) = join.await {
                error!(error = %err, "worker task failed");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    broker: Arc<dyn Broker>,
    dispatcher: Arc<Dispatcher>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!(worker_id, "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // lease は待つことがあるので shutdown と競合させる
        let delivery = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            delivery = broker.lease() => delivery,
        };

        let Some(delivery) = delivery else {
            info!(worker_id, "broker closed; worker exiting");
            break;
        };

        if let Err(err) = dispatcher.process(delivery).await {
            error!(worker_id, error = %err, "could not settle task with the broker");
        }
    }
    debug!(worker_id, "worker stopped");
}
