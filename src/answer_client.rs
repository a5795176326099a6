use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::models::{AnswerResult, QueryRequest};

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("answer service request timed out")]
    Timeout,
    #[error("failed to reach answer service: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("answer service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl From<reqwest::Error> for AnswerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AnswerError::Timeout
        } else {
            AnswerError::Transport(err)
        }
    }
}

/// The external service that turns a question into a narrative answer plus
/// cited matches.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn query(&self, text: &str) -> Result<AnswerResult, AnswerError>;
}

#[derive(Clone)]
pub struct AnswerClient {
    client: Client,
    base_url: String,
}

impl AnswerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Value, AnswerError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerError::Status {
                status,
                body: normalize_err_body(&body),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl AnswerService for AnswerClient {
    async fn query(&self, text: &str) -> Result<AnswerResult, AnswerError> {
        let url = format!("{}/api/query", self.base_url);
        tracing::debug!("POST {} query={:?}", url, text);

        let response = self
            .client
            .post(url)
            .json(&QueryRequest {
                query: text.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerError::Status {
                status,
                body: normalize_err_body(&body),
            });
        }

        let body = response.text().await?;
        Ok(AnswerResult::from_body(&body))
    }
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        for field in ["detail", "error"] {
            if let Some(err) = json.get(field).and_then(|v| v.as_str()) {
                return err.to_string();
            }
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_prefers_detail_field() {
        assert_eq!(
            normalize_err_body(r#"{"detail": "Error processing query"}"#),
            "Error processing query"
        );
        assert_eq!(normalize_err_body(r#"{"error": "boom"}"#), "boom");
        assert_eq!(normalize_err_body("  "), "<empty body>");
        assert_eq!(normalize_err_body("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = AnswerClient::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
