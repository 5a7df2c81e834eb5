//! Document handlers - test documents and the versioned aggregate.
//!
//! Handlers validate the path and the caller before touching the database,
//! and validate bodies against the engine invariants before storing them.

use crate::auth::AuthUser;
use crate::db;
use crate::error::{AppError, Result};
use quizsync_engine::{AggregateStats, DocumentPath, TestRecord, Versioned};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Default number of tests returned by a listing.
pub const DEFAULT_LIST_LIMIT: usize = 5;

/// Maximum number of tests returned by a listing.
pub const MAX_LIST_LIMIT: usize = 100;

/// Query parameters for listing tests.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// Request body for a compare-and-swap aggregate write.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutStatsRequest {
    /// Version the client read, absent when the document did not exist
    #[serde(default)]
    pub expected_version: Option<u64>,
    pub stats: AggregateStats,
}

/// Response for an aggregate write.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutStatsResponse {
    pub version: u64,
}

fn stored_document_error(path: &DocumentPath, err: serde_json::Error) -> AppError {
    AppError::Internal(format!("stored document {} is unreadable: {}", path, err))
}

/// Check a test document before it is stored.
pub fn validate_test(path: &DocumentPath, record: &TestRecord) -> Result<()> {
    record.result.validate()?;
    if record.exam_id != *path.exam_id() {
        return Err(AppError::BadRequest(format!(
            "examId '{}' does not match path {}",
            record.exam_id, path
        )));
    }
    if !record.user_id.is_empty() && record.user_id != *path.user_id() {
        return Err(AppError::BadRequest(format!(
            "userId '{}' does not match path {}",
            record.user_id, path
        )));
    }
    Ok(())
}

/// Create or overwrite a test document.
pub async fn handle_put_test(
    pool: &PgPool,
    auth: &AuthUser,
    path: DocumentPath,
    mut record: TestRecord,
) -> Result<()> {
    auth.authorize(path.user_id())?;
    validate_test(&path, &record)?;

    let DocumentPath::Test {
        user_id,
        exam_id,
        test_id,
    } = &path
    else {
        return Err(AppError::BadRequest(format!("{} is not a test document", path)));
    };

    if record.user_id.is_empty() {
        record.user_id = user_id.clone();
    }

    db::upsert_test(pool, user_id, exam_id, test_id, &record).await?;
    tracing::debug!(path = %path, "Test document stored");
    Ok(())
}

/// Read a test document.
pub async fn handle_get_test(
    pool: &PgPool,
    auth: &AuthUser,
    path: DocumentPath,
) -> Result<TestRecord> {
    auth.authorize(path.user_id())?;

    let DocumentPath::Test {
        user_id,
        exam_id,
        test_id,
    } = &path
    else {
        return Err(AppError::BadRequest(format!("{} is not a test document", path)));
    };

    let stored = db::get_test(pool, user_id, exam_id, test_id)
        .await?
        .ok_or_else(|| AppError::NotFound(path.to_string()))?;

    stored
        .to_record()
        .map_err(|e| stored_document_error(&path, e))
}

/// The most recent tests of a collection, newest first.
pub async fn handle_list_tests(
    pool: &PgPool,
    auth: &AuthUser,
    collection: DocumentPath,
    query: ListQuery,
) -> Result<Vec<TestRecord>> {
    auth.authorize(collection.user_id())?;

    let limit = query.effective_limit();
    let rows = db::list_recent_tests(
        pool,
        collection.user_id(),
        collection.exam_id(),
        limit as i64,
    )
    .await?;

    // Rows that no longer decode are skipped, not fatal to the listing.
    let records = rows
        .iter()
        .filter_map(|row| match row.to_record() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(test_id = %row.test_id, error = %e, "Skipping unreadable test");
                None
            }
        })
        .collect();
    Ok(records)
}

/// Read the aggregate with its version.
pub async fn handle_get_stats(
    pool: &PgPool,
    auth: &AuthUser,
    path: DocumentPath,
) -> Result<Versioned<AggregateStats>> {
    auth.authorize(path.user_id())?;

    let stored = db::get_stats(pool, path.user_id(), path.exam_id())
        .await?
        .ok_or_else(|| AppError::NotFound(path.to_string()))?;

    let stats = stored
        .to_stats()
        .map_err(|e| stored_document_error(&path, e))?;
    Ok(Versioned::new(stored.version as u64, stats))
}

/// Compare-and-swap write of the aggregate.
pub async fn handle_put_stats(
    pool: &PgPool,
    auth: &AuthUser,
    path: DocumentPath,
    request: PutStatsRequest,
) -> Result<PutStatsResponse> {
    auth.authorize(path.user_id())?;
    request.stats.validate()?;

    let written = db::put_stats(
        pool,
        path.user_id(),
        path.exam_id(),
        &request.stats,
        request.expected_version,
    )
    .await?;

    match written {
        Some(version) => {
            tracing::debug!(path = %path, version, "Stats stored");
            Ok(PutStatsResponse { version })
        }
        None => {
            let current = db::get_stats(pool, path.user_id(), path.exam_id())
                .await?
                .map(|s| s.version as u64);
            tracing::debug!(
                path = %path,
                expected = ?request.expected_version,
                current = ?current,
                "Stats write refused"
            );
            Err(AppError::Conflict {
                path: path.to_string(),
                current,
            })
        }
    }
}
