//! Remote document store client.
//!
//! The canonical copy of every test document and aggregate lives in a
//! network-backed document store addressed by [`DocumentPath`]. The
//! [`RemoteStore`] trait is the only way the rest of the client reaches it.

mod http;
mod memory;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

use crate::error::RemoteError;
use async_trait::async_trait;
use quizsync_engine::{AggregateStats, DocumentPath, TestRecord, Versioned};

/// Result type for remote store calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Reads and writes of per-user, per-exam documents.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create or overwrite a test document.
    async fn put_test(&self, path: &DocumentPath, record: &TestRecord) -> RemoteResult<()>;

    /// Read one test document.
    async fn get_test(&self, path: &DocumentPath) -> RemoteResult<Option<TestRecord>>;

    /// The `limit` most recent tests of a collection, newest first.
    async fn recent_tests(
        &self,
        collection: &DocumentPath,
        limit: usize,
    ) -> RemoteResult<Vec<TestRecord>>;

    /// Read the aggregate with its current version.
    async fn get_stats(&self, path: &DocumentPath)
        -> RemoteResult<Option<Versioned<AggregateStats>>>;

    /// Compare-and-swap write of the aggregate.
    ///
    /// `expected` must be the version that was read, or `None` when the
    /// document did not exist. Returns the new version, or
    /// [`RemoteError::VersionConflict`] if the document moved in between.
    async fn put_stats(
        &self,
        path: &DocumentPath,
        stats: &AggregateStats,
        expected: Option<u64>,
    ) -> RemoteResult<u64>;
}
