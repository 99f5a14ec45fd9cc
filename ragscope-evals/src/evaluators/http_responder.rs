// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! HTTP adapter for the RAG system under test

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::{
    collaborators::{RagResponder, RagResponse},
    EvalError,
};

/// Posts `{"input": question}` to a RAG endpoint and reads
/// `{"answer": ..., "context": [...]}` back
pub struct HttpRagResponder {
    endpoint: String,
    client: reqwest::Client,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpRagResponder {
    pub fn new(endpoint: &str) -> Result<Self, EvalError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            api_key: None,
            timeout: Duration::from_secs(120),
        })
    }

    /// Set API key for authentication
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct RagRequest<'a> {
    input: &'a str,
}

#[async_trait]
impl RagResponder for HttpRagResponder {
    async fn respond(&self, question: &str) -> Result<RagResponse, EvalError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&RagRequest { input: question })
            .timeout(self.timeout);

        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EvalError::Rag(format!("HTTP {}: {}", status, body)));
        }

        let body = response.text().await?;
        serde_json::from_str::<RagResponse>(&body)
            .map_err(|e| EvalError::Rag(format!("unexpected response body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::NO_ANSWER;

    #[tokio::test]
    async fn test_respond_posts_input_with_bearer_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/invoke")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({"input": "What is the deductible?"}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer": "$500", "context": ["The deductible is $500."]}"#)
            .create_async()
            .await;

        let responder = HttpRagResponder::new(&format!("{}/invoke", server.url()))
            .unwrap()
            .with_api_key("secret");
        let response = responder.respond("What is the deductible?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.answer, "$500");
        assert_eq!(response.context, vec!["The deductible is $500.".to_string()]);
    }

    #[tokio::test]
    async fn test_error_status_is_rag_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/invoke")
            .with_status(502)
            .with_body("upstream down")
            .create_async()
            .await;

        let responder = HttpRagResponder::new(&format!("{}/invoke", server.url())).unwrap();
        let err = responder.respond("q").await.unwrap_err();
        assert!(matches!(err, EvalError::Rag(msg) if msg.contains("upstream down")));
    }

    #[tokio::test]
    async fn test_missing_answer_uses_placeholder() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/invoke")
            .with_status(200)
            .with_body(r#"{"context": []}"#)
            .create_async()
            .await;

        let responder = HttpRagResponder::new(&format!("{}/invoke", server.url())).unwrap();
        let response = responder.respond("q").await.unwrap();
        assert_eq!(response.answer, NO_ANSWER);
        assert!(response.context.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_is_rag_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/invoke")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let responder = HttpRagResponder::new(&format!("{}/invoke", server.url())).unwrap();
        assert!(matches!(
            responder.respond("q").await,
            Err(EvalError::Rag(_))
        ));
    }
}
