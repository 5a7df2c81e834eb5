//! Recording a finished test.
//!
//! The result is written locally first, then remotely when online. A remote
//! write that cannot happen now is queued for the reconciler, so no path
//! loses a result.

use crate::context::SyncContext;
use crate::error::Result;
use crate::session::Session;
use crate::stats::StatsEngine;
use quizsync_engine::{
    test_id, PendingSyncItem, QueueDurability, StatsView, TestId, TestRecord, TestResult,
};
use serde::Serialize;

/// How far a recorded result got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordStatus {
    /// Stored remotely and folded into the canonical aggregate
    Synced,
    /// Saved on the device, queued for the remote store
    Pending,
    /// Neither store accepted it; held in memory until the next queue write
    Failed,
}

/// What the presentation layer is told after `record`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub status: RecordStatus,
    pub test_id: TestId,
    pub pending_count: usize,
    pub stats: StatsView,
}

impl RecordOutcome {
    /// Short user-facing description of the status.
    pub fn message(&self) -> &'static str {
        match self.status {
            RecordStatus::Synced => "Result saved",
            RecordStatus::Pending => "Saved locally, will sync when online",
            RecordStatus::Failed => "Could not save result to storage",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultRecorder {
    ctx: SyncContext,
    stats: StatsEngine,
}

impl ResultRecorder {
    pub fn new(ctx: SyncContext, stats: StatsEngine) -> Self {
        Self { ctx, stats }
    }

    /// Persist a graded result.
    ///
    /// Errors only for a result that does not fit the session's exam or a
    /// session for another exam; storage failures are reported in the
    /// outcome.
    pub async fn record(&self, session: &Session, result: TestResult) -> Result<RecordOutcome> {
        self.ctx.check_session(session)?;
        result.validate_for(&session.exam)?;

        let test_id = test_id(result.timestamp);
        let record = TestRecord::new(result, session.user_id.clone(), &session.exam);

        if let Err(e) = self.ctx.with_local(|local| local.save_test(&record)) {
            tracing::warn!(test_id = %test_id, error = %e, "Failed to save test locally");
        }

        let status = if self.ctx.is_online() {
            match self.write_remote(session, &test_id, &record).await {
                Ok(()) => RecordStatus::Synced,
                Err(e) => {
                    tracing::warn!(test_id = %test_id, error = %e, "Remote save failed, queueing");
                    self.enqueue(record)
                }
            }
        } else {
            tracing::debug!(test_id = %test_id, "Offline, queueing");
            self.enqueue(record)
        };

        let stats = self.stats.refresh(session).await;
        let pending_count = self.ctx.with_local(|local| local.pending_count());

        tracing::info!(test_id = %test_id, ?status, pending_count, "Test recorded");
        Ok(RecordOutcome {
            status,
            test_id,
            pending_count,
            stats,
        })
    }

    /// Write the test document, then fold it into the aggregate.
    async fn write_remote(
        &self,
        session: &Session,
        test_id: &TestId,
        record: &TestRecord,
    ) -> Result<()> {
        let path = session.test_path(test_id.clone())?;
        self.ctx.remote.put_test(&path, record).await?;
        self.stats
            .apply_canonical(&session.stats_path()?, &record.result)
            .await?;
        Ok(())
    }

    /// Queue the record under its own timestamp, so a replay overwrites the
    /// same remote document.
    fn enqueue(&self, record: TestRecord) -> RecordStatus {
        let queued_at = record.timestamp();
        let item = PendingSyncItem::test_result(record, queued_at);
        match self.ctx.with_local(|local| local.enqueue(item)) {
            QueueDurability::Persisted => RecordStatus::Pending,
            QueueDurability::MemoryOnly => RecordStatus::Failed,
        }
    }
}
