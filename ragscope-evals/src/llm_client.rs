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

//! LLM client abstraction for golden synthesis, LLM-as-judge scoring and
//! failure summarization

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const JUDGE_SYSTEM_PROMPT: &str = "You are an expert evaluator. Respond only with valid JSON.";

/// Trait for LLM clients used in evaluations
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a prompt and get structured JSON response
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError>;

    /// Send a prompt and get a free-text completion
    async fn complete(&self, prompt: String) -> Result<LLMResponse, LLMError>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

impl LLMResponse {
    /// Parse response as JSON
    pub fn as_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from embedding clients
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Trait for embedding clients used in evaluations
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text string
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError>;
}

/// Ollama client implementation (local models)
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Every request is bounded by `timeout`; an expired request surfaces as
    /// an HTTP error
    pub fn new(base_url: String, model: String, timeout: Duration) -> Result<Self, LLMError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    async fn chat(&self, prompt: String, json_mode: bool) -> Result<LLMResponse, LLMError> {
        let mut messages = Vec::with_capacity(2);
        if json_mode {
            messages.push(serde_json::json!({
                "role": "system",
                "content": JUDGE_SYSTEM_PROMPT
            }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": prompt }));

        let mut request = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": { "temperature": 0.0 }
        });
        if json_mode {
            request["format"] = serde_json::json!("json");
        }

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::ApiError(format!("HTTP {}: {}", status, error_text)));
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["message"]["content"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        // Ollama omits token counts for cached prompts
        let prompt_tokens = response_data["prompt_eval_count"].as_u64().unwrap_or(0) as u32;
        let completion_tokens = response_data["eval_count"].as_u64().unwrap_or(0) as u32;

        Ok(LLMResponse {
            content,
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            model: self.model.clone(),
        })
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        self.chat(prompt, true).await
    }

    async fn complete(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        self.chat(prompt, false).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingClient for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbedError> {
        let request = serde_json::json!({
            "model": self.model,
            "prompt": text
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(EmbedError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;
        let embedding: Vec<f64> = response_data["embedding"]
            .as_array()
            .map(|values| values.iter().filter_map(|v| v.as_f64()).collect())
            .unwrap_or_default();

        if embedding.is_empty() {
            return Err(EmbedError::ApiError("No embedding returned".to_string()));
        }

        Ok(embedding)
    }
}

/// Cosine similarity of two embeddings; 0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_ollama_evaluate_requests_json_format() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "llama3.2",
                "format": "json",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"model":"llama3.2","message":{"role":"assistant","content":"{\"score\": 0.7}"},"prompt_eval_count":12,"eval_count":5,"done":true}"#,
            )
            .create_async()
            .await;

        let client = OllamaClient::new(server.url(), "llama3.2".to_string(), TIMEOUT).unwrap();
        let response = client.evaluate("judge this".to_string()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.as_json().unwrap()["score"], serde_json::json!(0.7));
        assert_eq!(response.usage.total_tokens, 17);
    }

    #[tokio::test]
    async fn test_ollama_error_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_body("model not found")
            .create_async()
            .await;

        let client = OllamaClient::new(server.url(), "missing".to_string(), TIMEOUT).unwrap();
        let err = client.complete("hello".to_string()).await.unwrap_err();
        assert!(matches!(err, LLMError::ApiError(msg) if msg.contains("model not found")));
    }

    #[tokio::test]
    async fn test_ollama_embed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding":[0.1,0.2,0.3]}"#)
            .create_async()
            .await;

        let client =
            OllamaClient::new(server.url(), "nomic-embed-text".to_string(), TIMEOUT).unwrap();
        let embedding = client.embed("policy text").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
