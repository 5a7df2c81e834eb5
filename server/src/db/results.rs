//! Database operations for the tests table.

use quizsync_engine::TestRecord;
use sqlx::{PgPool, Row};

/// A stored test document row from the database.
#[derive(Debug)]
pub struct StoredTest {
    pub user_id: String,
    pub exam_id: String,
    pub test_id: String,
    pub taken_at: i64,
    pub body: serde_json::Value,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredTest {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredTest {
            user_id: row.try_get("user_id")?,
            exam_id: row.try_get("exam_id")?,
            test_id: row.try_get("test_id")?,
            taken_at: row.try_get("taken_at")?,
            body: row.try_get("body")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredTest {
    /// Decode the stored body.
    pub fn to_record(&self) -> Result<TestRecord, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Create or overwrite a test document.
pub async fn upsert_test(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
    test_id: &str,
    record: &TestRecord,
) -> Result<(), sqlx::Error> {
    let body = serde_json::to_value(record).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO tests (user_id, exam_id, test_id, taken_at, body, updated_at)
        VALUES ($1, $2, $3, $4, $5, now())
        ON CONFLICT (user_id, exam_id, test_id) DO UPDATE SET
            taken_at = EXCLUDED.taken_at,
            body = EXCLUDED.body,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(test_id)
    .bind(record.timestamp() as i64)
    .bind(body)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a test document.
pub async fn get_test(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
    test_id: &str,
) -> Result<Option<StoredTest>, sqlx::Error> {
    sqlx::query_as::<_, StoredTest>(
        r#"
        SELECT user_id, exam_id, test_id, taken_at, body, updated_at
        FROM tests
        WHERE user_id = $1 AND exam_id = $2 AND test_id = $3
        "#,
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(test_id)
    .fetch_optional(pool)
    .await
}

/// The most recent tests of a user's exam, newest first.
pub async fn list_recent_tests(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
    limit: i64,
) -> Result<Vec<StoredTest>, sqlx::Error> {
    sqlx::query_as::<_, StoredTest>(
        r#"
        SELECT user_id, exam_id, test_id, taken_at, body, updated_at
        FROM tests
        WHERE user_id = $1 AND exam_id = $2
        ORDER BY taken_at DESC, test_id DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
