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

//! LLM-as-judge scorer for the five RAG metrics
//!
//! Every metric is a dedicated prompt that asks the judge model for
//! `{"score": <float 0-1>, "reason": "<explanation>"}`.

use async_trait::async_trait;
use ragscope_core::{Golden, Metric};
use std::sync::Arc;
use tracing::debug;

use crate::{
    collaborators::{MetricScore, MetricScorer},
    llm_client::LLMClient,
    EvalError,
};

const VERDICT_FORMAT: &str = r#"Respond in JSON:
{
  "score": <float 0-1>,
  "reason": "<one or two sentences explaining the score>"
}"#;

/// Scores test cases by prompting a judge model
pub struct LlmJudgeScorer {
    llm_client: Arc<dyn LLMClient>,
}

impl LlmJudgeScorer {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self { llm_client }
    }

    fn answer_relevancy_prompt(question: &str, answer: &str) -> String {
        format!(
            r#"Evaluate how relevant the answer is to the question.

QUESTION:
{question}

ANSWER:
{answer}

Split the answer into statements and decide for each whether it addresses the
question. The score is the fraction of relevant statements.

{VERDICT_FORMAT}"#
        )
    }

    fn faithfulness_prompt(context: &[String], answer: &str) -> String {
        format!(
            r#"Evaluate if the answer is faithful to the retrieved context (no hallucinations).

RETRIEVED CONTEXT:
{context}

ANSWER:
{answer}

Extract all claims from the answer and verify each against the context. The
score is the fraction of claims that the context supports or does not
contradict.

{VERDICT_FORMAT}"#,
            context = numbered(context)
        )
    }

    fn contextual_precision_prompt(
        question: &str,
        expected: &str,
        context: &[String],
    ) -> String {
        format!(
            r#"Evaluate the precision of the retrieved context for answering the question.

QUESTION:
{question}

EXPECTED ANSWER:
{expected}

RETRIEVED CONTEXT (in retrieval order):
{context}

Decide for each chunk whether it was useful for arriving at the expected
answer. Relevant chunks ranked above irrelevant ones score higher; the score
is the mean precision at each relevant position.

{VERDICT_FORMAT}"#,
            context = numbered(context)
        )
    }

    fn contextual_recall_prompt(expected: &str, context: &[String]) -> String {
        format!(
            r#"Evaluate if all necessary context was retrieved.

EXPECTED ANSWER:
{expected}

RETRIEVED CONTEXT:
{context}

Split the expected answer into sentences and decide for each whether it can be
attributed to the retrieved context. The score is the fraction of attributable
sentences.

{VERDICT_FORMAT}"#,
            context = numbered(context)
        )
    }

    fn contextual_relevancy_prompt(question: &str, context: &[String]) -> String {
        format!(
            r#"Evaluate how relevant the retrieved context is to the question.

QUESTION:
{question}

RETRIEVED CONTEXT:
{context}

Extract the statements made in the context and decide for each whether it is
relevant to the question. The score is the fraction of relevant statements.

{VERDICT_FORMAT}"#,
            context = numbered(context)
        )
    }

    fn prompt_for(metric: Metric, case: &Golden) -> Result<String, EvalError> {
        let question = case.input.as_str();
        let prompt = match metric {
            Metric::AnswerRelevancy => Self::answer_relevancy_prompt(question, actual(case)?),
            Metric::Faithfulness => {
                Self::faithfulness_prompt(retrieved(case)?, actual(case)?)
            }
            Metric::ContextualPrecision => {
                Self::contextual_precision_prompt(question, expected(case)?, retrieved(case)?)
            }
            Metric::ContextualRecall => {
                Self::contextual_recall_prompt(expected(case)?, retrieved(case)?)
            }
            Metric::ContextualRelevancy => {
                Self::contextual_relevancy_prompt(question, retrieved(case)?)
            }
        };
        Ok(prompt)
    }
}

fn numbered(context: &[String]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[Chunk {}]: {}", i, c))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn actual(case: &Golden) -> Result<&str, EvalError> {
    case.actual_output
        .as_deref()
        .ok_or_else(|| EvalError::MissingField("actual_output".to_string()))
}

fn expected(case: &Golden) -> Result<&str, EvalError> {
    case.expected_output
        .as_deref()
        .ok_or_else(|| EvalError::MissingField("expected_output".to_string()))
}

fn retrieved(case: &Golden) -> Result<&[String], EvalError> {
    if case.retrieval_context.is_empty() {
        return Err(EvalError::MissingField("retrieval_context".to_string()));
    }
    Ok(&case.retrieval_context)
}

#[async_trait]
impl MetricScorer for LlmJudgeScorer {
    async fn score(&self, metric: Metric, case: &Golden) -> Result<MetricScore, EvalError> {
        let prompt = Self::prompt_for(metric, case)?;
        let response = self.llm_client.evaluate(prompt).await?;
        debug!(
            "{} judged by {} ({} tokens)",
            metric,
            self.llm_client.model_name(),
            response.usage.total_tokens
        );

        let verdict = response
            .as_json()
            .map_err(|e| EvalError::LLMClientError(format!("JSON parse error: {}", e)))?;
        MetricScore::from_json(&verdict)
    }
}
