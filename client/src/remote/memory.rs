//! In-process remote store.
//!
//! Behaves like the real document store, including compare-and-swap on the
//! aggregate, and can be told to fail so callers exercise their fallbacks.

use super::{RemoteResult, RemoteStore};
use crate::error::RemoteError;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use quizsync_engine::{next_version, AggregateStats, DocumentPath, TestRecord, Versioned};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryRemote {
    tests: DashMap<DocumentPath, TestRecord>,
    stats: DashMap<DocumentPath, Versioned<AggregateStats>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    test_writes: AtomicUsize,
    stats_writes: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail as if the network were down.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail as if the network were down.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of test documents stored under a collection.
    pub fn test_count(&self, collection: &DocumentPath) -> usize {
        let collection = collection.collection();
        self.tests
            .iter()
            .filter(|entry| entry.key().collection() == collection)
            .count()
    }

    /// Successful test writes, overwrites included.
    pub fn test_writes(&self) -> usize {
        self.test_writes.load(Ordering::SeqCst)
    }

    /// Successful aggregate writes.
    pub fn stats_writes(&self) -> usize {
        self.stats_writes.load(Ordering::SeqCst)
    }

    /// Current aggregate without going through the failure switches.
    pub fn stats_snapshot(&self, path: &DocumentPath) -> Option<Versioned<AggregateStats>> {
        self.stats.get(path).map(|doc| doc.value().clone())
    }

    fn check_read(&self) -> RemoteResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("simulated read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> RemoteResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("simulated write failure".into()));
        }
        Ok(())
    }
}

fn expect_kind(path: &DocumentPath, test: bool) -> RemoteResult<()> {
    let ok = match path {
        DocumentPath::Test { .. } => test,
        DocumentPath::Stats { .. } => !test,
        DocumentPath::Tests { .. } => false,
    };
    if ok {
        Ok(())
    } else {
        Err(RemoteError::Rejected {
            status: 400,
            message: format!("wrong document kind at {}", path),
        })
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn put_test(&self, path: &DocumentPath, record: &TestRecord) -> RemoteResult<()> {
        self.check_write()?;
        expect_kind(path, true)?;
        self.tests.insert(path.clone(), record.clone());
        self.test_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_test(&self, path: &DocumentPath) -> RemoteResult<Option<TestRecord>> {
        self.check_read()?;
        expect_kind(path, true)?;
        Ok(self.tests.get(path).map(|r| r.value().clone()))
    }

    async fn recent_tests(
        &self,
        collection: &DocumentPath,
        limit: usize,
    ) -> RemoteResult<Vec<TestRecord>> {
        self.check_read()?;
        let collection = collection.collection();
        let mut records: Vec<TestRecord> = self
            .tests
            .iter()
            .filter(|entry| entry.key().collection() == collection)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        records.truncate(limit);
        Ok(records)
    }

    async fn get_stats(
        &self,
        path: &DocumentPath,
    ) -> RemoteResult<Option<Versioned<AggregateStats>>> {
        self.check_read()?;
        expect_kind(path, false)?;
        Ok(self.stats_snapshot(path))
    }

    async fn put_stats(
        &self,
        path: &DocumentPath,
        stats: &AggregateStats,
        expected: Option<u64>,
    ) -> RemoteResult<u64> {
        self.check_write()?;
        expect_kind(path, false)?;

        let conflict = || RemoteError::VersionConflict {
            path: path.to_string(),
            expected,
        };

        let version = match self.stats.entry(path.clone()) {
            Entry::Occupied(mut entry) => {
                let version =
                    next_version(Some(entry.get().version), expected).ok_or_else(conflict)?;
                entry.insert(Versioned::new(version, stats.clone()));
                version
            }
            Entry::Vacant(entry) => {
                let version = next_version(None, expected).ok_or_else(conflict)?;
                entry.insert(Versioned::new(version, stats.clone()));
                version
            }
        };

        self.stats_writes.fetch_add(1, Ordering::SeqCst);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizsync_engine::{ExamInfo, TestResult};

    fn record(timestamp: u64) -> TestRecord {
        let exam = ExamInfo::new("civil", "Civil", 24, 18);
        let result = TestResult::grade(&exam, timestamp, 24, 20, vec![]).unwrap();
        TestRecord::new(result, "u1", &exam)
    }

    fn test_path(id: &str) -> DocumentPath {
        DocumentPath::test("u1", "civil", id).unwrap()
    }

    #[tokio::test]
    async fn put_test_is_an_idempotent_overwrite() {
        let remote = MemoryRemote::new();
        remote.put_test(&test_path("test_1"), &record(1)).await.unwrap();
        remote.put_test(&test_path("test_1"), &record(1)).await.unwrap();

        assert_eq!(remote.test_count(&test_path("test_1")), 1);
        assert_eq!(remote.test_writes(), 2);
    }

    #[tokio::test]
    async fn recent_tests_newest_first_and_limited() {
        let remote = MemoryRemote::new();
        for ts in 1..=8 {
            remote
                .put_test(&test_path(&format!("test_{}", ts)), &record(ts))
                .await
                .unwrap();
        }
        let other = DocumentPath::test("u2", "civil", "test_99").unwrap();
        remote.put_test(&other, &record(99)).await.unwrap();

        let tests_path = DocumentPath::tests("u1", "civil").unwrap();
        let recent = remote.recent_tests(&tests_path, 5).await.unwrap();
        let ts: Vec<u64> = recent.iter().map(|r| r.timestamp()).collect();
        assert_eq!(ts, vec![8, 7, 6, 5, 4]);
    }

    #[tokio::test]
    async fn stats_compare_and_swap() {
        let remote = MemoryRemote::new();
        let path = DocumentPath::stats("u1", "civil").unwrap();
        let stats = AggregateStats::new();

        assert_eq!(remote.put_stats(&path, &stats, None).await.unwrap(), 1);
        assert_eq!(remote.put_stats(&path, &stats, Some(1)).await.unwrap(), 2);

        let stale = remote.put_stats(&path, &stats, Some(1)).await;
        assert!(matches!(stale, Err(RemoteError::VersionConflict { .. })));
        let blind = remote.put_stats(&path, &stats, None).await;
        assert!(matches!(blind, Err(RemoteError::VersionConflict { .. })));

        assert_eq!(remote.get_stats(&path).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn failure_switches() {
        let remote = MemoryRemote::new();
        remote.set_fail_writes(true);
        assert!(remote.put_test(&test_path("test_1"), &record(1)).await.is_err());

        remote.set_fail_writes(false);
        remote.set_fail_reads(true);
        assert!(remote.get_test(&test_path("test_1")).await.is_err());
        assert_eq!(remote.test_writes(), 0);
    }

    #[tokio::test]
    async fn rejects_wrong_document_kind() {
        let remote = MemoryRemote::new();
        let stats_path = DocumentPath::stats("u1", "civil").unwrap();
        assert!(remote.put_test(&stats_path, &record(1)).await.is_err());
    }
}
