//! One handle bundling the recorder, stats engine and reconciler.

use crate::config::{ClientConfig, DEFAULT_RECENT_LIMIT};
use crate::connectivity::ConnectivityMonitor;
use crate::context::SyncContext;
use crate::dispatcher::{DispatcherHandle, SyncDispatcher};
use crate::error::Result;
use crate::reconciler::{ReconcilerConfig, SyncReconciler, SyncReport};
use crate::recorder::{RecordOutcome, ResultRecorder};
use crate::remote::HttpRemote;
use crate::session::Session;
use crate::stats::{StatsEngine, DEFAULT_CAS_ATTEMPTS};
use crate::storage::FileBackend;
use quizsync_engine::{LocalStore, StatsView, TestRecord, TestResult, TopError};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct QuizsyncClient {
    ctx: SyncContext,
    stats: StatsEngine,
    recorder: ResultRecorder,
    reconciler: Arc<SyncReconciler>,
    recent_limit: usize,
}

impl QuizsyncClient {
    /// Wire the components around an existing context with default settings.
    pub fn new(ctx: SyncContext) -> Self {
        Self::with_settings(
            ctx,
            DEFAULT_CAS_ATTEMPTS,
            ReconcilerConfig::default(),
            DEFAULT_RECENT_LIMIT,
        )
    }

    pub fn with_settings(
        ctx: SyncContext,
        cas_attempts: u32,
        reconciler: ReconcilerConfig,
        recent_limit: usize,
    ) -> Self {
        let stats = StatsEngine::new(ctx.clone()).with_cas_attempts(cas_attempts);
        let recorder = ResultRecorder::new(ctx.clone(), stats.clone());
        let reconciler = Arc::new(SyncReconciler::new(ctx.clone(), stats.clone(), reconciler));
        Self {
            ctx,
            stats,
            recorder,
            reconciler,
            recent_limit,
        }
    }

    /// Build a client talking HTTP to the configured server, with the local
    /// store for `exam_id` under the configured data directory.
    pub fn from_config(
        config: &ClientConfig,
        exam_id: &str,
        monitor: ConnectivityMonitor,
    ) -> Result<Self> {
        let remote = HttpRemote::new(config.remote_url.clone(), config.auth_token.clone())?;
        let local = LocalStore::new(FileBackend::open(&config.data_dir)?, exam_id);
        let ctx = SyncContext::new(Arc::new(remote), local, monitor);

        tracing::info!(
            remote_url = %config.remote_url,
            data_dir = %config.data_dir.display(),
            exam_id,
            "Client ready"
        );

        Ok(Self::with_settings(
            ctx,
            config.cas_attempts,
            config.reconciler_config(),
            config.recent_limit,
        ))
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.ctx.monitor
    }

    pub async fn record(&self, session: &Session, result: TestResult) -> Result<RecordOutcome> {
        self.recorder.record(session, result).await
    }

    pub async fn drain(&self, session: &Session) -> SyncReport {
        self.reconciler.drain(session).await
    }

    pub async fn force_sync(&self, session: &Session) -> Result<(SyncReport, StatsView)> {
        self.reconciler.force_sync(session).await
    }

    pub async fn stats(&self, session: &Session) -> StatsView {
        self.stats.refresh(session).await
    }

    /// Most missed questions from the current statistics.
    pub async fn top_errors(&self, session: &Session, n: usize) -> Vec<TopError> {
        self.stats.refresh(session).await.stats.top_errors(n)
    }

    pub async fn recent_tests(&self, session: &Session) -> Vec<TestRecord> {
        self.stats.recent_tests(session, self.recent_limit).await
    }

    pub fn pending_count(&self) -> usize {
        self.ctx.with_local(|local| local.pending_count())
    }

    /// Start draining automatically on reconnect.
    pub fn spawn_dispatcher(&self, session: Session) -> DispatcherHandle {
        SyncDispatcher::new(self.reconciler.clone(), session).spawn()
    }
}
