//! Document routes, mirroring the document paths under `/v1`.
//!
//! ```text
//! GET|PUT /v1/users/{user_id}/exams/{exam_id}/tests/{test_id}
//! GET     /v1/users/{user_id}/exams/{exam_id}/tests?limit=N
//! GET|PUT /v1/users/{user_id}/exams/{exam_id}/stats/aggregate
//! ```

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_get_stats, handle_get_test, handle_list_tests, handle_put_stats, handle_put_test,
    ListQuery, PutStatsRequest, PutStatsResponse,
};
use crate::AppState;
use quizsync_engine::{AggregateStats, DocumentPath, TestRecord, Versioned};

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/users/{user_id}/exams/{exam_id}/tests/{test_id}",
            get(get_test_handler).put(put_test_handler),
        )
        .route(
            "/v1/users/{user_id}/exams/{exam_id}/tests",
            get(list_tests_handler),
        )
        .route(
            "/v1/users/{user_id}/exams/{exam_id}/stats/aggregate",
            get(get_stats_handler).put(put_stats_handler),
        )
}

/// PUT a test document.
async fn put_test_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, exam_id, test_id)): Path<(String, String, String)>,
    Json(record): Json<TestRecord>,
) -> Result<StatusCode> {
    let path = DocumentPath::test(user_id, exam_id, test_id)?;
    handle_put_test(&state.pool, &auth, path, record).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET a test document.
async fn get_test_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, exam_id, test_id)): Path<(String, String, String)>,
) -> Result<Json<TestRecord>> {
    let path = DocumentPath::test(user_id, exam_id, test_id)?;
    Ok(Json(handle_get_test(&state.pool, &auth, path).await?))
}

/// GET the most recent tests.
async fn list_tests_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, exam_id)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TestRecord>>> {
    let collection = DocumentPath::tests(user_id, exam_id)?;
    Ok(Json(
        handle_list_tests(&state.pool, &auth, collection, query).await?,
    ))
}

/// GET the aggregate.
async fn get_stats_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, exam_id)): Path<(String, String)>,
) -> Result<Json<Versioned<AggregateStats>>> {
    let path = DocumentPath::stats(user_id, exam_id)?;
    Ok(Json(handle_get_stats(&state.pool, &auth, path).await?))
}

/// PUT the aggregate with an expected version.
async fn put_stats_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, exam_id)): Path<(String, String)>,
    Json(request): Json<PutStatsRequest>,
) -> Result<Json<PutStatsResponse>> {
    let path = DocumentPath::stats(user_id, exam_id)?;
    Ok(Json(
        handle_put_stats(&state.pool, &auth, path, request).await?,
    ))
}
