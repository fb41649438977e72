//! HTTP client for the clinic's remote database service.

use super::{Persistence, QueryResult, Statement, StorageError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Serialize)]
struct TransactionRequest<'a> {
    statements: &'a [Statement],
}

#[derive(Deserialize)]
struct TransactionResponse {
    results: Vec<QueryResult>,
}

#[derive(Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Forwards statements to the remote service, which owns the database.
///
/// The service accepts `POST /api/query` with `{sql, params}` and
/// `POST /api/transaction` with `{statements: [...]}`.
pub struct RemotePersistence {
    client: reqwest::Client,
    base_url: String,
}

impl RemotePersistence {
    /// # Arguments
    /// * `base_url` - Base URL of the service (e.g., "http://localhost:3000")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: &str, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to database service")?;

        if response.status().is_success() {
            Ok(())
        } else {
            anyhow::bail!(
                "Database service health check failed with status: {}",
                response.status()
            )
        }
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, StorageError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&text, status),
            });
        }

        Ok(response.json().await?)
    }
}

fn upstream_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<UpstreamErrorBody>(body) {
        if let Some(message) = parsed.message.or(parsed.error) {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[async_trait]
impl Persistence for RemotePersistence {
    async fn execute(&self, statement: &Statement) -> Result<QueryResult, StorageError> {
        self.post("/api/query", statement).await
    }

    async fn execute_in_transaction(
        &self,
        statements: &[Statement],
    ) -> Result<Vec<QueryResult>, StorageError> {
        let response: TransactionResponse = self
            .post("/api/transaction", &TransactionRequest { statements })
            .await?;
        if response.results.len() != statements.len() {
            return Err(StorageError::Decode {
                what: "transaction",
                reason: format!(
                    "expected {} results, got {}",
                    statements.len(),
                    response.results.len()
                ),
            });
        }
        Ok(response.results)
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_removed() {
        let client = RemotePersistence::new("http://localhost:3000/", 30).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn base_url_without_slash_is_kept() {
        let client = RemotePersistence::new("http://db.clinic.local:8080", 30).unwrap();
        assert_eq!(client.base_url(), "http://db.clinic.local:8080");
    }

    #[test]
    fn upstream_message_prefers_json_message() {
        let status = reqwest::StatusCode::BAD_GATEWAY;
        assert_eq!(
            upstream_message(r#"{"message":"Firebird offline"}"#, status),
            "Firebird offline"
        );
        assert_eq!(upstream_message(r#"{"error":"locked"}"#, status), "locked");
        assert_eq!(upstream_message("  ", status), "Bad Gateway");
        assert_eq!(upstream_message("plain failure", status), "plain failure");
    }
}
