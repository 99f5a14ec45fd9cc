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

//! Hand-written collaborator fakes shared by the unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use ragscope_core::{Golden, Metric, SynthesisParams};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    collaborators::{GoldenGenerator, MetricScore, MetricScorer, RagResponder, RagResponse},
    llm_client::{LLMClient, LLMError, LLMResponse, TokenUsage},
    EvalError,
};

/// Scores by golden input; unknown inputs score 1.0
#[derive(Default)]
pub struct ScriptedScorer {
    scores: HashMap<String, Result<f64, String>>,
    pub calls: AtomicUsize,
}

impl ScriptedScorer {
    pub fn score_for(mut self, input: &str, score: f64) -> Self {
        self.scores.insert(input.to_string(), Ok(score));
        self
    }

    pub fn fail_for(mut self, input: &str, error: &str) -> Self {
        self.scores.insert(input.to_string(), Err(error.to_string()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricScorer for ScriptedScorer {
    async fn score(&self, metric: Metric, case: &Golden) -> Result<MetricScore, EvalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scores.get(&case.input) {
            Some(Ok(score)) => Ok(MetricScore::new(
                *score,
                format!("{} judged {}", metric, case.input),
            )),
            Some(Err(error)) => Err(EvalError::LLMClientError(error.clone())),
            None => Ok(MetricScore::new(1.0, "perfect")),
        }
    }
}

/// Panics on every call, as a crashing judge would
pub struct PanickingScorer;

#[async_trait]
impl MetricScorer for PanickingScorer {
    async fn score(&self, metric: Metric, _case: &Golden) -> Result<MetricScore, EvalError> {
        panic!("judge for {} crashed", metric);
    }
}

pub struct FakeGenerator {
    goldens: Vec<Golden>,
    pub calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            goldens: inputs
                .iter()
                .map(|input| Golden::new(*input).with_expected_output(format!("about {}", input)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GoldenGenerator for FakeGenerator {
    async fn generate(
        &self,
        _source_doc: &Path,
        _params: SynthesisParams,
    ) -> Result<Vec<Golden>, EvalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.goldens.clone())
    }
}

/// Answers every question with an echo and one retrieved passage
#[derive(Default)]
pub struct EchoResponder {
    pub calls: AtomicUsize,
    fail_on: Option<String>,
}

impl EchoResponder {
    pub fn failing_on(question: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Some(question.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RagResponder for EchoResponder {
    async fn respond(&self, question: &str) -> Result<RagResponse, EvalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(question) {
            return Err(EvalError::Rag("HTTP 503: unavailable".to_string()));
        }
        Ok(RagResponse {
            answer: format!("answer to {}", question),
            context: vec![format!("passage for {}", question)],
        })
    }
}

/// Records prompts and replies with fixed text
pub struct RecordingLLM {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingLLM {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LLMClient for RecordingLLM {
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        self.complete(prompt).await
    }

    async fn complete(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        self.prompts.lock().push(prompt);
        Ok(LLMResponse {
            content: self.reply.clone(),
            usage: TokenUsage::default(),
            model: "mock-model".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
