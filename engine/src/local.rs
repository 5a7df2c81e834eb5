//! Local durable store.
//!
//! Key-value persistence scoped to one exam. Three independent namespaces are
//! kept under `{examId}_{namespace}` keys:
//!
//! - `tests` - the most recent test records, oldest evicted first
//! - `stats` - the cached aggregate
//! - `pending_sync` - writes waiting for the remote store, in enqueue order
//!
//! Reads never fail. Missing or corrupt data degrades to an empty or default
//! value and is logged. Writes report failures so callers can fall back, but
//! a pending item is never dropped: if the backend refuses it, it is held in
//! memory until the next successful write of the queue.

use crate::{
    error::Result, AggregateStats, Error, ExamId, PendingSyncItem, TestId, TestRecord,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Number of test records kept in the local history.
pub const HISTORY_LIMIT: usize = 20;

/// Raw string key-value storage underneath a [`LocalStore`].
pub trait KvBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory backend with an optional byte quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that refuses writes once `bytes` of values are stored.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// Total bytes of stored values.
    pub fn used_bytes(&self) -> usize {
        self.entries.values().map(String::len).sum()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        if let Some(quota) = self.quota {
            let current = self.entries.get(key).map(String::len).unwrap_or(0);
            let needed = self.used_bytes() - current + value.len();
            if needed > quota {
                return Err(Error::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available: quota,
                });
            }
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// The namespaces kept per exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Tests,
    Stats,
    PendingSync,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Tests => "tests",
            Namespace::Stats => "stats",
            Namespace::PendingSync => "pending_sync",
        }
    }
}

/// Whether an enqueued item reached durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDurability {
    /// Written to the backend
    Persisted,
    /// The backend refused the write; held in memory only
    MemoryOnly,
}

/// Exam-scoped local store.
pub struct LocalStore {
    backend: Box<dyn KvBackend>,
    exam_id: ExamId,
    history_limit: usize,
    /// Pending items the backend refused, newest last
    overflow: Vec<PendingSyncItem>,
}

impl fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("exam_id", &self.exam_id)
            .field("history_limit", &self.history_limit)
            .field("overflow", &self.overflow.len())
            .finish()
    }
}

impl LocalStore {
    /// Create a store for one exam.
    pub fn new(backend: impl KvBackend + 'static, exam_id: impl Into<ExamId>) -> Self {
        Self {
            backend: Box::new(backend),
            exam_id: exam_id.into(),
            history_limit: HISTORY_LIMIT,
            overflow: Vec::new(),
        }
    }

    /// Override the number of test records kept.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    /// Storage key of a namespace for this exam.
    pub fn key(&self, namespace: Namespace) -> String {
        format!("{}_{}", self.exam_id, namespace.as_str())
    }

    /// Direct access to the backend.
    pub fn backend_mut(&mut self) -> &mut dyn KvBackend {
        self.backend.as_mut()
    }

    fn read<T: DeserializeOwned>(&self, namespace: Namespace) -> Option<T> {
        let key = self.key(namespace);
        match self.backend.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Corrupt local data, using default");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read local data");
                None
            }
        }
    }

    /// Read a list, skipping entries that no longer parse.
    fn read_list<T: DeserializeOwned>(&self, namespace: Namespace) -> Vec<T> {
        let Some(values) = self.read::<Vec<serde_json::Value>>(namespace) else {
            return Vec::new();
        };

        values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(
                        key = %self.key(namespace),
                        index,
                        error = %e,
                        "Skipping malformed local entry"
                    );
                    None
                }
            })
            .collect()
    }

    fn write<T: Serialize + ?Sized>(&mut self, namespace: Namespace, value: &T) -> Result<()> {
        let key = self.key(namespace);
        let raw = serde_json::to_string(value)?;
        if let Err(e) = self.backend.set(&key, raw) {
            tracing::warn!(key = %key, error = %e, "Failed to write local data");
            return Err(e);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // tests
    // ---------------------------------------------------------------------

    /// Append a record to the local history, evicting the oldest past the limit.
    pub fn save_test(&mut self, record: &TestRecord) -> Result<()> {
        let mut tests: Vec<TestRecord> = self.read_list(Namespace::Tests);
        tests.push(record.clone());
        if tests.len() > self.history_limit {
            let excess = tests.len() - self.history_limit;
            tests.drain(..excess);
        }
        self.write(Namespace::Tests, &tests)
    }

    /// The local history, oldest first.
    pub fn tests(&self) -> Vec<TestRecord> {
        self.read_list(Namespace::Tests)
    }

    /// The `n` most recent records, newest first.
    pub fn recent_tests(&self, n: usize) -> Vec<TestRecord> {
        let tests = self.tests();
        tests.into_iter().rev().take(n).collect()
    }

    // ---------------------------------------------------------------------
    // stats
    // ---------------------------------------------------------------------

    /// The cached aggregate, repaired if it violates the invariants.
    pub fn stats(&self) -> Option<AggregateStats> {
        let mut stats: AggregateStats = self.read(Namespace::Stats)?;
        if stats.sanitize() {
            tracing::warn!(
                key = %self.key(Namespace::Stats),
                "Cached stats violated invariants and were repaired"
            );
        }
        Some(stats)
    }

    pub fn save_stats(&mut self, stats: &AggregateStats) -> Result<()> {
        self.write(Namespace::Stats, stats)
    }

    // ---------------------------------------------------------------------
    // pending_sync
    // ---------------------------------------------------------------------

    fn durable_pending(&self) -> Vec<PendingSyncItem> {
        self.read_list(Namespace::PendingSync)
    }

    /// The whole pending queue in enqueue order.
    pub fn pending(&self) -> Vec<PendingSyncItem> {
        let mut queue = self.durable_pending();
        queue.extend(self.overflow.iter().cloned());
        queue
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Append an item to the pending queue.
    ///
    /// Never loses the item: when the backend refuses the write the item is
    /// kept in memory and retried with the next enqueue.
    pub fn enqueue(&mut self, item: PendingSyncItem) -> QueueDurability {
        let mut queue = self.pending();
        queue.push(item.clone());

        match self.write(Namespace::PendingSync, &queue) {
            Ok(()) => {
                self.overflow.clear();
                QueueDurability::Persisted
            }
            Err(e) => {
                tracing::error!(
                    document_id = %item.document_id(),
                    error = %e,
                    "Pending item kept in memory only"
                );
                self.overflow.push(item);
                QueueDurability::MemoryOnly
            }
        }
    }

    /// Replace the drained part of the queue in a single write.
    ///
    /// Items in `processed` are removed, `requeue` is put back at the head,
    /// and anything enqueued while the drain was running is kept after it.
    pub fn settle_pending(
        &mut self,
        processed: &[PendingSyncItem],
        requeue: Vec<PendingSyncItem>,
    ) -> Result<()> {
        let processed_ids: HashSet<TestId> = processed.iter().map(|i| i.document_id()).collect();

        let mut queue = requeue;
        queue.extend(
            self.pending()
                .into_iter()
                .filter(|item| !processed_ids.contains(&item.document_id())),
        );

        let written = if queue.is_empty() {
            let key = self.key(Namespace::PendingSync);
            self.backend.remove(&key)
        } else {
            self.write(Namespace::PendingSync, &queue)
        };

        match written {
            Ok(()) => {
                self.overflow.clear();
                Ok(())
            }
            Err(e) => {
                // Drop the stale durable copy so drained items are not
                // replayed, and hold the settled queue in memory.
                let key = self.key(Namespace::PendingSync);
                self.backend.remove(&key).map_err(|remove_err| {
                    tracing::error!(error = %remove_err, "Pending queue could not be settled");
                    e
                })?;
                self.overflow = queue;
                Ok(())
            }
        }
    }
}
