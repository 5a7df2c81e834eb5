//! Database operations for the stats table.
//!
//! Writes are compare-and-swap on the `version` column: the first write
//! inserts version 1, every later write must name the version it read.

use quizsync_engine::AggregateStats;
use sqlx::{PgPool, Row};

/// A stored aggregate row from the database.
#[derive(Debug)]
pub struct StoredStats {
    pub user_id: String,
    pub exam_id: String,
    pub version: i64,
    pub body: serde_json::Value,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredStats {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredStats {
            user_id: row.try_get("user_id")?,
            exam_id: row.try_get("exam_id")?,
            version: row.try_get("version")?,
            body: row.try_get("body")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredStats {
    /// Decode the stored body.
    pub fn to_stats(&self) -> Result<AggregateStats, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Get the aggregate of a user's exam.
pub async fn get_stats(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
) -> Result<Option<StoredStats>, sqlx::Error> {
    sqlx::query_as::<_, StoredStats>(
        r#"
        SELECT user_id, exam_id, version, body, updated_at
        FROM stats
        WHERE user_id = $1 AND exam_id = $2
        "#,
    )
    .bind(user_id)
    .bind(exam_id)
    .fetch_optional(pool)
    .await
}

/// Write the aggregate if it is still at `expected`.
///
/// Returns the new version, or `None` when the stored version differs (or
/// the document exists although `expected` is `None`).
pub async fn put_stats(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
    stats: &AggregateStats,
    expected: Option<u64>,
) -> Result<Option<u64>, sqlx::Error> {
    let body = serde_json::to_value(stats).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    let version: Option<i64> = match expected {
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO stats (user_id, exam_id, version, body, updated_at)
                VALUES ($1, $2, 1, $3, now())
                ON CONFLICT (user_id, exam_id) DO NOTHING
                RETURNING version
                "#,
            )
            .bind(user_id)
            .bind(exam_id)
            .bind(body)
            .fetch_optional(pool)
            .await?
        }
        Some(expected) => {
            sqlx::query_scalar(
                r#"
                UPDATE stats
                SET version = version + 1, body = $3, updated_at = now()
                WHERE user_id = $1 AND exam_id = $2 AND version = $4
                RETURNING version
                "#,
            )
            .bind(user_id)
            .bind(exam_id)
            .bind(body)
            .bind(expected as i64)
            .fetch_optional(pool)
            .await?
        }
    };

    Ok(version.map(|v| v as u64))
}
