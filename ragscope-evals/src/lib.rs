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

//! # Ragscope Evaluation Engine
//!
//! Orchestrates a RAG evaluation run end to end:
//!
//! - **Golden acquisition**: synthesize question/answer goldens from a source
//!   document, cached on disk per eval type
//! - **RAG augmentation**: record the system-under-test's answer and retrieved
//!   passages for every golden
//! - **Parallel scoring**: one metric runner per metric, in-process or in an
//!   isolated worker process
//! - **Failure summarization**: an LLM turns the failing cases into
//!   improvement suggestions
//! - **Reporting**: a fixed-format text report persisted next to the
//!   per-metric artifacts
//!
//! ## Example
//!
//! ```rust,ignore
//! use ragscope_core::{EvalType, Settings};
//! use ragscope_evals::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let pipeline = Pipeline::from_settings(&settings, None)?;
//!     let run = pipeline.execute(EvalType::Quick).await?;
//!     println!("{}", run.report_text);
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod collaborators;
pub mod coordinator;
pub mod evaluators;
pub mod llm_client;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod summarizer;

#[cfg(test)]
pub(crate) mod testing;

pub use collaborators::{
    GoldenGenerator, MetricScore, MetricScorer, RagResponder, RagResponse,
};
pub use coordinator::Coordinator;
pub use llm_client::{EmbeddingClient, LLMClient, LLMResponse, OllamaClient, TokenUsage};
pub use pipeline::{EvaluationExecutor, Pipeline, PipelineError};
pub use report::compose_report;
pub use runner::{MetricOutcome, MetricRunner, RunnerError};
pub use summarizer::{FailureSummarizer, SummaryError, NO_FAILURES_MESSAGE};

/// Errors raised by a collaborator (generator, RAG responder, scorer)
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("LLM client error: {0}")]
    LLMClientError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("RAG endpoint error: {0}")]
    Rag(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<llm_client::LLMError> for EvalError {
    fn from(e: llm_client::LLMError) -> Self {
        EvalError::LLMClientError(e.to_string())
    }
}

impl From<llm_client::EmbedError> for EvalError {
    fn from(e: llm_client::EmbedError) -> Self {
        EvalError::LLMClientError(format!("embedding failed: {}", e))
    }
}
