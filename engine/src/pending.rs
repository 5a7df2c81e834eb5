//! Writes queued locally until the remote store accepts them.

use crate::{result::test_id, TestId, TestRecord, Timestamp};
use serde::{Deserialize, Serialize};

/// Kind of a queued write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingKind {
    /// A completed test awaiting its remote document and aggregate update
    #[serde(rename = "test-result", alias = "test")]
    TestResult,
}

/// A queued write awaiting remote commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSyncItem {
    #[serde(rename = "type")]
    pub kind: PendingKind,
    pub data: TestRecord,
    /// When the item was queued (milliseconds since epoch)
    #[serde(rename = "timestamp")]
    pub queued_at: Timestamp,
}

impl PendingSyncItem {
    /// Queue a test record.
    pub fn test_result(data: TestRecord, queued_at: Timestamp) -> Self {
        Self {
            kind: PendingKind::TestResult,
            data,
            queued_at,
        }
    }

    /// Identifier of the remote document this item will be written to.
    ///
    /// Derived from `queued_at`, so replaying an item overwrites the same
    /// document instead of creating a duplicate.
    pub fn document_id(&self) -> TestId {
        test_id(self.queued_at)
    }
}
