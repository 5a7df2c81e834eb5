//! Aggregate statistics against the canonical store.
//!
//! The remote aggregate is updated with a read-fold-write loop guarded by
//! the document version. When another device writes in between, the write
//! is refused and the loop starts over from a fresh read.

use crate::context::SyncContext;
use crate::error::{ClientError, RemoteError, Result};
use crate::session::Session;
use quizsync_engine::{resolve, AggregateStats, DocumentPath, StatsView, TestRecord, TestResult};

/// Default number of compare-and-swap attempts per fold.
pub const DEFAULT_CAS_ATTEMPTS: u32 = 5;

/// Result of folding one test into the aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub stats: AggregateStats,
    /// Whether the canonical copy was updated, as opposed to only the
    /// local cache
    pub canonical: bool,
}

#[derive(Debug, Clone)]
pub struct StatsEngine {
    ctx: SyncContext,
    cas_attempts: u32,
}

impl StatsEngine {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            cas_attempts: DEFAULT_CAS_ATTEMPTS,
        }
    }

    pub fn with_cas_attempts(mut self, attempts: u32) -> Self {
        self.cas_attempts = attempts.max(1);
        self
    }

    /// Fold a result into the canonical aggregate, or into the local cache
    /// when the canonical store cannot be reached.
    pub async fn apply(&self, session: &Session, result: &TestResult) -> Result<Applied> {
        self.ctx.check_session(session)?;

        if self.ctx.is_online() {
            match self.apply_canonical(&session.stats_path()?, result).await {
                Ok(stats) => {
                    return Ok(Applied {
                        stats,
                        canonical: true,
                    })
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %session.user_id,
                        exam_id = %session.exam.id,
                        error = %e,
                        "Canonical stats update failed, folding into local cache"
                    );
                }
            }
        }

        let stats = self.apply_local(result)?;
        Ok(Applied {
            stats,
            canonical: false,
        })
    }

    /// Fold a result into the remote aggregate at `path`.
    ///
    /// On success the local cache is replaced by the new canonical copy.
    pub async fn apply_canonical(
        &self,
        path: &DocumentPath,
        result: &TestResult,
    ) -> Result<AggregateStats> {
        for attempt in 1..=self.cas_attempts {
            let (mut stats, expected) = match self.ctx.remote.get_stats(path).await? {
                Some(doc) => {
                    let mut stats = doc.data;
                    if stats.sanitize() {
                        tracing::warn!(path = %path, "Remote stats violated invariants and were repaired");
                    }
                    (stats, Some(doc.version))
                }
                None => (AggregateStats::new(), None),
            };

            stats.apply(result, self.ctx.now());

            match self.ctx.remote.put_stats(path, &stats, expected).await {
                Ok(version) => {
                    tracing::debug!(path = %path, version, attempt, "Stats updated");
                    self.mirror(path, &stats);
                    return Ok(stats);
                }
                Err(RemoteError::VersionConflict { .. }) => {
                    tracing::debug!(path = %path, attempt, "Stats changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ClientError::ContentionExhausted(self.cas_attempts))
    }

    fn apply_local(&self, result: &TestResult) -> Result<AggregateStats> {
        let now = self.ctx.now();
        self.ctx
            .with_local(|local| {
                let mut stats = local.stats().unwrap_or_default();
                stats.apply(result, now);
                local.save_stats(&stats).map(|()| stats)
            })
            .map_err(ClientError::from)
    }

    fn mirror(&self, path: &DocumentPath, stats: &AggregateStats) {
        self.ctx.with_local(|local| {
            if local.exam_id() != path.exam_id() {
                return;
            }
            if let Err(e) = local.save_stats(stats) {
                tracing::warn!(path = %path, error = %e, "Failed to mirror stats to local cache");
            }
        });
    }

    /// Current statistics for display.
    ///
    /// Never fails: an unreachable remote falls back to the local cache and
    /// an empty cache to an all-zero aggregate.
    pub async fn refresh(&self, session: &Session) -> StatsView {
        let canonical = if self.ctx.is_online() {
            match self.remote_stats(session).await {
                Ok(stats) => stats,
                Err(e) => {
                    tracing::warn!(user_id = %session.user_id, error = %e, "Falling back to cached stats");
                    None
                }
            }
        } else {
            None
        };

        let cached = self.ctx.with_local(|local| {
            if local.exam_id() == &session.exam.id {
                local.stats()
            } else {
                None
            }
        });

        let (stats, source) = resolve(canonical, cached);
        StatsView::new(stats, source)
    }

    async fn remote_stats(&self, session: &Session) -> Result<Option<AggregateStats>> {
        let doc = self.ctx.remote.get_stats(&session.stats_path()?).await?;
        Ok(doc.map(|doc| {
            let mut stats = doc.data;
            stats.sanitize();
            stats
        }))
    }

    /// The `n` most recent tests, newest first.
    ///
    /// Comes from the remote listing when online, else from the local
    /// history.
    pub async fn recent_tests(&self, session: &Session, n: usize) -> Vec<TestRecord> {
        if self.ctx.is_online() {
            let remote = match session.tests_path() {
                Ok(path) => self
                    .ctx
                    .remote
                    .recent_tests(&path, n)
                    .await
                    .map_err(ClientError::from),
                Err(e) => Err(e.into()),
            };
            match remote {
                Ok(tests) => return tests,
                Err(e) => {
                    tracing::warn!(user_id = %session.user_id, error = %e, "Falling back to local history");
                }
            }
        }

        self.ctx.with_local(|local| {
            if local.exam_id() == &session.exam.id {
                local.recent_tests(n)
            } else {
                Vec::new()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::connectivity::ConnectivityMonitor;
    use crate::remote::{MemoryRemote, RemoteStore};
    use quizsync_engine::{AnswerError, ExamInfo, LocalStore, MemoryBackend, StatsSource};
    use std::sync::Arc;

    fn setup(online: bool) -> (Arc<MemoryRemote>, SyncContext, Session) {
        let remote = Arc::new(MemoryRemote::new());
        let exam = ExamInfo::new("civil", "Civil", 24, 18);
        let ctx = SyncContext::new(
            remote.clone(),
            LocalStore::new(MemoryBackend::new(), "civil"),
            ConnectivityMonitor::new(online),
        )
        .with_clock(Arc::new(ManualClock::starting_at(10_000)));
        let session = Session::new("u1", exam).unwrap();
        (remote, ctx, session)
    }

    fn result(session: &Session, ts: u64, correct: u32) -> TestResult {
        let errors = (0..24 - correct)
            .map(|i| AnswerError::wrong(format!("q{}", i), "Q?", "A", "B"))
            .collect();
        TestResult::grade(&session.exam, ts, 24, correct, errors).unwrap()
    }

    #[tokio::test]
    async fn canonical_apply_creates_then_advances() {
        let (remote, ctx, session) = setup(true);
        let engine = StatsEngine::new(ctx.clone());

        let applied = engine.apply(&session, &result(&session, 1, 20)).await.unwrap();
        assert!(applied.canonical);
        assert_eq!(applied.stats.total_tests, 1);

        engine.apply(&session, &result(&session, 2, 10)).await.unwrap();
        let doc = remote.stats_snapshot(&session.stats_path().unwrap()).unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.data.total_tests, 2);
        assert_eq!(doc.data.passed_tests, 1);

        // mirrored
        assert_eq!(ctx.with_local(|l| l.stats()), Some(doc.data));
    }

    #[tokio::test]
    async fn falls_back_to_local_cache_when_remote_fails() {
        let (remote, ctx, session) = setup(true);
        remote.set_fail_reads(true);
        let engine = StatsEngine::new(ctx.clone());

        let applied = engine.apply(&session, &result(&session, 1, 20)).await.unwrap();
        assert!(!applied.canonical);
        assert_eq!(ctx.with_local(|l| l.stats()).unwrap().total_tests, 1);
        assert_eq!(remote.stats_writes(), 0);
    }

    #[tokio::test]
    async fn refresh_prefers_non_empty_cache_over_empty_remote() {
        let (remote, ctx, session) = setup(true);
        let engine = StatsEngine::new(ctx.clone());
        let path = session.stats_path().unwrap();

        remote
            .put_stats(&path, &AggregateStats::new(), None)
            .await
            .unwrap();
        let mut cached = AggregateStats::new();
        cached.apply(&result(&session, 1, 20), 5);
        ctx.with_local(|l| l.save_stats(&cached)).unwrap();

        let view = engine.refresh(&session).await;
        assert_eq!(view.source, StatsSource::LocalCache);
        assert_eq!(view.stats.total_tests, 1);
        assert_eq!(view.success_rate, 100);
    }

    #[tokio::test]
    async fn refresh_offline_uses_cache_or_zero() {
        let (_remote, ctx, session) = setup(false);
        let engine = StatsEngine::new(ctx);

        let view = engine.refresh(&session).await;
        assert_eq!(view.source, StatsSource::Empty);
        assert!(view.stats.is_empty());
    }

    #[tokio::test]
    async fn recent_tests_fall_back_to_local_history() {
        let (remote, ctx, session) = setup(true);
        for ts in 1..=7 {
            let record = TestRecord::new(result(&session, ts, 20), "u1", &session.exam);
            ctx.with_local(|l| l.save_test(&record)).unwrap();
        }
        remote.set_fail_reads(true);

        let engine = StatsEngine::new(ctx);
        let recent = engine.recent_tests(&session, 5).await;
        let ts: Vec<u64> = recent.iter().map(|r| r.timestamp()).collect();
        assert_eq!(ts, vec![7, 6, 5, 4, 3]);
    }

    #[tokio::test]
    async fn rejects_session_for_another_exam() {
        let (_remote, ctx, _session) = setup(true);
        let other = Session::new("u1", ExamInfo::new("tax", "Tax", 24, 18)).unwrap();
        let engine = StatsEngine::new(ctx);

        let err = engine
            .apply(&other, &result(&other, 1, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Engine(_)));
    }
}
