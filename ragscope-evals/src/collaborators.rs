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

//! Capability interfaces for the external collaborators of a run
//!
//! The pipeline only sees these traits. Concrete adapters live in
//! [`crate::evaluators`]; tests substitute hand-written fakes.

use async_trait::async_trait;
use ragscope_core::{Golden, Metric, SynthesisParams};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::EvalError;

/// Produces goldens from a source document
#[async_trait]
pub trait GoldenGenerator: Send + Sync {
    async fn generate(
        &self,
        source_doc: &Path,
        params: SynthesisParams,
    ) -> Result<Vec<Golden>, EvalError>;
}

/// Answer and retrieved passages from the system under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    #[serde(default = "default_answer")]
    pub answer: String,
    #[serde(default)]
    pub context: Vec<String>,
}

/// Stand-in answer when the agent returns none
pub const NO_ANSWER: &str = "No answer found.";

fn default_answer() -> String {
    NO_ANSWER.to_string()
}

/// The RAG system under test
#[async_trait]
pub trait RagResponder: Send + Sync {
    async fn respond(&self, question: &str) -> Result<RagResponse, EvalError>;
}

/// One metric's verdict on one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub score: f64,
    #[serde(default)]
    pub reason: String,
}

impl MetricScore {
    pub fn new(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score,
            reason: reason.into(),
        }
    }

    /// Reject NaN and scores outside `[0, 1]`
    pub fn validate(self) -> Result<Self, EvalError> {
        if self.score.is_finite() && (0.0..=1.0).contains(&self.score) {
            Ok(self)
        } else {
            Err(EvalError::InvalidScore(format!(
                "score {} is outside [0, 1]",
                self.score
            )))
        }
    }

    /// Parse a judge verdict of the form `{"score": <number>, "reason": <string>}`
    pub fn from_json(value: &serde_json::Value) -> Result<Self, EvalError> {
        let score = match value.get("score") {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            // Small local models sometimes quote the number
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| EvalError::MissingField("score".to_string()))?;

        let reason = value
            .get("reason")
            .and_then(|r| r.as_str())
            .unwrap_or_default()
            .to_string();

        MetricScore { score, reason }.validate()
    }
}

/// Scores one test case against one metric
#[async_trait]
pub trait MetricScorer: Send + Sync {
    async fn score(&self, metric: Metric, case: &Golden) -> Result<MetricScore, EvalError>;
}
