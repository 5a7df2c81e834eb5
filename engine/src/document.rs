//! Versioned document envelope used for compare-and-swap writes.

use serde::{Deserialize, Serialize};

/// Version of a document that has never been written.
pub const INITIAL_VERSION: u64 = 1;

/// A document body with the version it was read at.
///
/// Every successful write bumps the version by one. A write that names a
/// stale version is refused, which turns the read-modify-write of the
/// aggregate into a compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Versioned<T> {
    pub version: u64,
    pub data: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, data: T) -> Self {
        Self { version, data }
    }
}

/// The version a compare-and-swap write produces, or `None` if it must be
/// refused.
pub fn next_version(current: Option<u64>, expected: Option<u64>) -> Option<u64> {
    match (current, expected) {
        (None, None) => Some(INITIAL_VERSION),
        (Some(current), Some(expected)) if current == expected => Some(current + 1),
        _ => None,
    }
}
