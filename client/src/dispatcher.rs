//! Background task that drains the pending queue on reconnect.

use crate::connectivity::{ConnectivityEvent, ConnectivityEvents};
use crate::reconciler::{SyncReconciler, SyncReport};
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Runs a drain at startup (when online) and on every `BecameOnline`.
pub struct SyncDispatcher {
    reconciler: Arc<SyncReconciler>,
    session: Session,
    events: ConnectivityEvents,
}

impl SyncDispatcher {
    pub fn new(reconciler: Arc<SyncReconciler>, session: Session) -> Self {
        let events = reconciler.context().monitor.subscribe();
        Self {
            reconciler,
            session,
            events,
        }
    }

    /// Start the loop on the current runtime.
    pub fn spawn(self) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(shutdown_rx, report_tx));

        DispatcherHandle {
            shutdown: Some(shutdown_tx),
            reports: report_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut shutdown: oneshot::Receiver<()>,
        reports: mpsc::UnboundedSender<SyncReport>,
    ) {
        if self.reconciler.context().is_online() {
            let report = self.reconciler.drain(&self.session).await;
            let _ = reports.send(report);
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = self.events.next() => match event {
                    Some(ConnectivityEvent::BecameOnline) => {
                        let report = self.reconciler.drain(&self.session).await;
                        let _ = reports.send(report);
                    }
                    Some(ConnectivityEvent::BecameOffline) => {}
                    None => break,
                },
            }
        }

        tracing::debug!(user_id = %self.session.user_id, "Sync dispatcher stopped");
    }
}

/// Owner side of a running [`SyncDispatcher`].
#[derive(Debug)]
pub struct DispatcherHandle {
    shutdown: Option<oneshot::Sender<()>>,
    reports: mpsc::UnboundedReceiver<SyncReport>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Wait for the report of the next drain. `None` once stopped.
    pub async fn next_report(&mut self) -> Option<SyncReport> {
        self.reports.recv().await
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Sync dispatcher task failed");
        }
    }
}
