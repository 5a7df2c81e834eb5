//! Remote store over the Quizsync HTTP API.
//!
//! Every document path maps onto `{base}/v1/{path}`. The aggregate is
//! written with an explicit expected version and the server answers
//! `409 Conflict` when it has moved.

use super::{RemoteResult, RemoteStore};
use crate::error::RemoteError;
use async_trait::async_trait;
use quizsync_engine::{AggregateStats, DocumentPath, TestRecord, Versioned};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body of a compare-and-swap aggregate write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PutStatsRequest<'a> {
    expected_version: Option<u64>,
    stats: &'a AggregateStats,
}

#[derive(Debug, Deserialize)]
struct PutStatsResponse {
    version: u64,
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(RemoteError::from)?;
        Ok(Self::with_client(client, base_url, token))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Absolute URL of a document.
    pub fn url(&self, path: &DocumentPath) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = self.authorize(request).send().await?;
        tracing::trace!(status = %response.status(), url = %response.url(), "Remote response");
        Ok(response)
    }
}

/// Turn a non-success response into the matching error.
async fn error_for(response: Response, path: &DocumentPath, expected: Option<u64>) -> RemoteError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    classify(status, message, path, expected)
}

fn classify(
    status: StatusCode,
    message: String,
    path: &DocumentPath,
    expected: Option<u64>,
) -> RemoteError {
    match status {
        StatusCode::CONFLICT => RemoteError::VersionConflict {
            path: path.to_string(),
            expected,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::PermissionDenied(message),
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            RemoteError::Unavailable(format!("{}: {}", s, message))
        }
        s => RemoteError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn put_test(&self, path: &DocumentPath, record: &TestRecord) -> RemoteResult<()> {
        let response = self
            .send(self.client.put(self.url(path)).json(record))
            .await?;
        if !response.status().is_success() {
            return Err(error_for(response, path, None).await);
        }
        Ok(())
    }

    async fn get_test(&self, path: &DocumentPath) -> RemoteResult<Option<TestRecord>> {
        let response = self.send(self.client.get(self.url(path))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.json().await?)),
            _ => Err(error_for(response, path, None).await),
        }
    }

    async fn recent_tests(
        &self,
        collection: &DocumentPath,
        limit: usize,
    ) -> RemoteResult<Vec<TestRecord>> {
        let collection = collection.collection();
        let request = self
            .client
            .get(self.url(&collection))
            .query(&[("limit", limit)]);
        let response = self.send(request).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s if s.is_success() => Ok(response.json().await?),
            _ => Err(error_for(response, &collection, None).await),
        }
    }

    async fn get_stats(
        &self,
        path: &DocumentPath,
    ) -> RemoteResult<Option<Versioned<AggregateStats>>> {
        let response = self.send(self.client.get(self.url(path))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.json().await?)),
            _ => Err(error_for(response, path, None).await),
        }
    }

    async fn put_stats(
        &self,
        path: &DocumentPath,
        stats: &AggregateStats,
        expected: Option<u64>,
    ) -> RemoteResult<u64> {
        let body = PutStatsRequest {
            expected_version: expected,
            stats,
        };
        let response = self
            .send(self.client.put(self.url(path)).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(error_for(response, path, expected).await);
        }
        let PutStatsResponse { version } = response.json().await?;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_path() -> DocumentPath {
        DocumentPath::stats("u1", "civil").unwrap()
    }

    #[test]
    fn builds_urls() {
        let remote = HttpRemote::with_client(Client::new(), "https://sync.example.com/", None);
        assert_eq!(
            remote.url(&stats_path()),
            "https://sync.example.com/v1/users/u1/exams/civil/stats/aggregate"
        );
    }

    #[test]
    fn status_mapping() {
        let path = stats_path();
        assert!(matches!(
            classify(StatusCode::CONFLICT, String::new(), &path, Some(3)),
            RemoteError::VersionConflict {
                expected: Some(3),
                ..
            }
        ));
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, "no".into(), &path, None),
            RemoteError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, String::new(), &path, None),
            RemoteError::Unavailable(_)
        ));
        assert_eq!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, "bad".into(), &path, None),
            RemoteError::Rejected {
                status: 422,
                message: "bad".into()
            }
        );
    }

    #[test]
    fn put_stats_body_shape() {
        let stats = AggregateStats::new();
        let body = PutStatsRequest {
            expected_version: Some(2),
            stats: &stats,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["expectedVersion"], 2);
        assert_eq!(json["stats"]["totalTests"], 0);
    }
}
