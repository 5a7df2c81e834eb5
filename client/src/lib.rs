//! # Quizsync Client
//!
//! Offline-first recording and synchronisation of quiz results.
//!
//! A finished test goes through [`ResultRecorder::record`]: it is saved on
//! the device, written to the remote document store when online, and queued
//! otherwise. The [`SyncReconciler`] replays the queue when connectivity
//! returns, and the [`StatsEngine`] keeps the per-exam aggregate current
//! with compare-and-swap writes so concurrent devices never lose updates.
//!
//! ```rust,no_run
//! use quizsync_client::{ClientConfig, ConnectivityMonitor, QuizsyncClient, Session};
//! use quizsync_engine::{ExamInfo, TestResult};
//!
//! # async fn run() -> quizsync_client::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let exam = ExamInfo::default();
//! let client = QuizsyncClient::from_config(&config, &exam.id, ConnectivityMonitor::new(true))?;
//! let session = Session::new("user-1", exam)?;
//!
//! let dispatcher = client.spawn_dispatcher(session.clone());
//!
//! let result = TestResult::grade(&session.exam, 1706745600000, 24, 20, vec![])?;
//! let outcome = client.record(&session, result).await?;
//! println!("{} ({} pending)", outcome.message(), outcome.pending_count);
//!
//! dispatcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod reconciler;
pub mod recorder;
pub mod remote;
pub mod session;
pub mod stats;
pub mod storage;

pub use client::QuizsyncClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ConfigError};
pub use connectivity::{ConnectivityEvent, ConnectivityEvents, ConnectivityMonitor};
pub use context::SyncContext;
pub use dispatcher::{DispatcherHandle, SyncDispatcher};
pub use error::{ClientError, RemoteError, Result};
pub use reconciler::{FailedItemPolicy, ReconcilerConfig, SyncReconciler, SyncReport};
pub use recorder::{RecordOutcome, RecordStatus, ResultRecorder};
pub use remote::{HttpRemote, MemoryRemote, RemoteStore};
pub use session::Session;
pub use stats::{Applied, StatsEngine};
pub use storage::FileBackend;
