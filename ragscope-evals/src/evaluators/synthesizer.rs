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

//! Golden synthesis from a plain-text source document
//!
//! The document is split into contexts on blank lines. Near-duplicate
//! contexts are dropped when an embedding client is configured. For each
//! remaining context the generation model writes question/answer pairs and
//! then rewrites every question through a series of evolutions that make it
//! harder to answer from a single sentence.

use async_trait::async_trait;
use ragscope_core::{Golden, SynthesisParams};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    collaborators::GoldenGenerator,
    llm_client::{cosine_similarity, EmbeddingClient, LLMClient},
    EvalError,
};

/// Contexts at least this similar to an already kept one are dropped
pub const SIMILARITY_THRESHOLD: f64 = 0.9;

const EVOLUTIONS: [&str; 4] = [
    "Rewrite the question so that answering it requires reasoning over more than one fact in the context.",
    "Rewrite the question so that it asks about a concrete scenario a customer could be in.",
    "Rewrite the question so that it adds a constraint or condition the answer must respect.",
    "Rewrite the question so that it compares two things mentioned in the context.",
];

#[derive(Debug, Deserialize)]
struct GeneratedPairs {
    #[serde(default)]
    goldens: Vec<GeneratedPair>,
}

#[derive(Debug, Deserialize)]
struct GeneratedPair {
    input: String,
    #[serde(default)]
    expected_output: Option<String>,
}

/// LLM-backed golden generator
pub struct LlmGoldenSynthesizer {
    llm_client: Arc<dyn LLMClient>,
    embedding_client: Option<Arc<dyn EmbeddingClient>>,
}

impl LlmGoldenSynthesizer {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            embedding_client: None,
        }
    }

    /// Add embedding client for near-duplicate context filtering
    pub fn with_embedding_client(mut self, client: Arc<dyn EmbeddingClient>) -> Self {
        self.embedding_client = Some(client);
        self
    }

    async fn dedup_contexts(&self, contexts: Vec<String>) -> Result<Vec<String>, EvalError> {
        let Some(embedder) = &self.embedding_client else {
            return Ok(contexts);
        };

        let mut kept: Vec<(String, Vec<f64>)> = Vec::with_capacity(contexts.len());
        for context in contexts {
            let embedding = embedder.embed(&context).await?;
            let duplicate = kept.iter().any(|(_, other)| {
                cosine_similarity(&embedding, other) >= SIMILARITY_THRESHOLD
            });
            if duplicate {
                debug!("Dropping near-duplicate context ({} chars)", context.len());
            } else {
                kept.push((context, embedding));
            }
        }
        Ok(kept.into_iter().map(|(context, _)| context).collect())
    }

    async fn generate_pairs(
        &self,
        context: &str,
        count: usize,
    ) -> Result<Vec<GeneratedPair>, EvalError> {
        let prompt = format!(
            r#"You are writing evaluation data for a question answering system.

CONTEXT:
{context}

Write {count} question(s) a user could ask that are answered by the context,
each with the correct answer taken from the context.

Respond in JSON:
{{
  "goldens": [
    {{"input": "<question>", "expected_output": "<answer>"}}
  ]
}}"#
        );

        let response = self.llm_client.evaluate(prompt).await.map_err(|e| {
            EvalError::LLMClientError(format!("Golden generation failed: {}", e))
        })?;
        let parsed: GeneratedPairs = serde_json::from_str(&response.content)?;

        Ok(parsed
            .goldens
            .into_iter()
            .filter(|pair| !pair.input.trim().is_empty())
            .take(count)
            .collect())
    }

    async fn evolve(
        &self,
        question: String,
        context: &str,
        rounds: usize,
    ) -> Result<String, EvalError> {
        let mut current = question;
        for round in 0..rounds {
            let instruction = EVOLUTIONS[round % EVOLUTIONS.len()];
            let prompt = format!(
                r#"{instruction}
The rewritten question must still be answerable from the context.

CONTEXT:
{context}

QUESTION:
{current}

Respond with ONLY the rewritten question, no explanation."#
            );

            let response = self.llm_client.complete(prompt).await.map_err(|e| {
                EvalError::LLMClientError(format!("Question evolution failed: {}", e))
            })?;
            let rewritten = clean_line(&response.content);
            if !rewritten.is_empty() {
                current = rewritten;
            }
        }
        Ok(current)
    }
}

/// Split a document into blank-line separated passages
pub fn split_contexts(text: &str) -> Vec<String> {
    let mut contexts = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                contexts.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        contexts.push(current.join("\n"));
    }
    contexts
}

fn clean_line(content: &str) -> String {
    content
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

#[async_trait]
impl GoldenGenerator for LlmGoldenSynthesizer {
    async fn generate(
        &self,
        source_doc: &Path,
        params: SynthesisParams,
    ) -> Result<Vec<Golden>, EvalError> {
        let text = tokio::fs::read_to_string(source_doc).await?;
        let contexts = split_contexts(&text);
        if contexts.is_empty() {
            return Err(EvalError::InvalidInput(format!(
                "source document {:?} has no text",
                source_doc
            )));
        }

        let contexts = self.dedup_contexts(contexts).await?;
        info!(
            "Synthesizing goldens from {} context(s) of {:?}",
            contexts.len(),
            source_doc
        );

        let mut goldens = Vec::new();
        for context in &contexts {
            let pairs = self
                .generate_pairs(context, params.max_goldens_per_context)
                .await?;
            for pair in pairs {
                let input = self.evolve(pair.input, context, params.num_evolutions).await?;
                let mut golden = Golden::new(input).with_context(vec![context.clone()]);
                golden.expected_output = pair.expected_output;
                goldens.push(golden);
            }
        }

        info!("Synthesized {} golden(s)", goldens.len());
        Ok(goldens)
    }
}
