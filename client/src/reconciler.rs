//! Draining the pending queue into the remote store.
//!
//! Items are replayed in enqueue order. Each replay is the same remote test
//! write plus aggregate fold the recorder does online, so a replayed item
//! ends up exactly where it would have been had the device been online.

use crate::context::SyncContext;
use crate::error::{ClientError, Result};
use crate::session::Session;
use crate::stats::StatsEngine;
use quizsync_engine::{DocumentPath, PendingSyncItem, StatsView};
use serde::Serialize;
use tokio::sync::Mutex;

/// What happens to items whose replay failed.
///
/// Items that failed for a reason retrying cannot fix (an invalid document,
/// a refusal by the remote store) are discarded under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedItemPolicy {
    /// Keep transient failures at the head of the queue for the next drain
    #[default]
    Requeue,
    /// Discard them with the rest of the drained queue
    Drop,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfig {
    pub failed_items: FailedItemPolicy,
}

/// Counts from one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub items_synced: usize,
    pub items_failed: usize,
    /// Failed items kept for the next drain
    pub items_requeued: usize,
    /// Failed items removed from the queue
    pub items_discarded: usize,
    /// Queue length after the drain
    pub pending_count: usize,
}

#[derive(Debug)]
pub struct SyncReconciler {
    ctx: SyncContext,
    stats: StatsEngine,
    config: ReconcilerConfig,
    drain_guard: Mutex<()>,
}

impl SyncReconciler {
    pub fn new(ctx: SyncContext, stats: StatsEngine, config: ReconcilerConfig) -> Self {
        Self {
            ctx,
            stats,
            config,
            drain_guard: Mutex::new(()),
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Replay every pending item.
    ///
    /// A no-op while offline, and when another drain is already running.
    /// Per-item failures are counted and never stop the pass.
    pub async fn drain(&self, session: &Session) -> SyncReport {
        if !self.ctx.is_online() {
            tracing::debug!("Offline, skipping drain");
            return self.idle_report();
        }

        let Ok(_guard) = self.drain_guard.try_lock() else {
            tracing::debug!("Drain already running, skipping");
            return self.idle_report();
        };

        let queue = self.ctx.with_local(|local| local.pending());
        if queue.is_empty() {
            return self.idle_report();
        }

        tracing::info!(items = queue.len(), "Draining pending queue");

        let mut report = SyncReport::default();
        let mut failed = Vec::new();
        for item in &queue {
            match self.replay(session, item).await {
                Ok(()) => report.items_synced += 1,
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        document_id = %item.document_id(),
                        error = %e,
                        "Pending item failed to sync"
                    );
                    report.items_failed += 1;
                    failed.push(item.clone());
                }
                Err(e) => {
                    tracing::error!(
                        document_id = %item.document_id(),
                        error = %e,
                        "Pending item can never sync, discarding"
                    );
                    report.items_failed += 1;
                }
            }
        }

        let requeue = match self.config.failed_items {
            FailedItemPolicy::Requeue => failed,
            FailedItemPolicy::Drop => Vec::new(),
        };
        report.items_requeued = requeue.len();
        report.items_discarded = report.items_failed - report.items_requeued;

        if let Err(e) = self
            .ctx
            .with_local(|local| local.settle_pending(&queue, requeue))
        {
            tracing::error!(error = %e, "Failed to settle pending queue");
        }

        report.pending_count = self.ctx.with_local(|local| local.pending_count());
        tracing::info!(
            synced = report.items_synced,
            failed = report.items_failed,
            requeued = report.items_requeued,
            discarded = report.items_discarded,
            pending = report.pending_count,
            "Drain finished"
        );
        report
    }

    /// Drain now and return fresh statistics. Fails when offline.
    pub async fn force_sync(&self, session: &Session) -> Result<(SyncReport, StatsView)> {
        if !self.ctx.is_online() {
            return Err(ClientError::Offline);
        }
        self.ctx.check_session(session)?;
        let report = self.drain(session).await;
        let view = self.stats.refresh(session).await;
        Ok((report, view))
    }

    async fn replay(&self, session: &Session, item: &PendingSyncItem) -> Result<()> {
        let record = &item.data;
        let user_id = if record.user_id.is_empty() {
            &session.user_id
        } else {
            &record.user_id
        };
        let exam_id = if record.exam_id.is_empty() {
            &session.exam.id
        } else {
            &record.exam_id
        };

        let test_path =
            DocumentPath::test(user_id.clone(), exam_id.clone(), item.document_id())?;
        self.ctx.remote.put_test(&test_path, record).await?;

        let stats_path = DocumentPath::stats(user_id.clone(), exam_id.clone())?;
        self.stats.apply_canonical(&stats_path, &record.result).await?;
        Ok(())
    }

    fn idle_report(&self) -> SyncReport {
        SyncReport {
            pending_count: self.ctx.with_local(|local| local.pending_count()),
            ..SyncReport::default()
        }
    }
}
