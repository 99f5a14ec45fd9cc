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

//! Failure summarizer
//!
//! Collects the below-pass cases of every metric that did not rate `Good`
//! and asks the LLM for failure patterns and improvement suggestions.

use ragscope_core::{
    ArtifactStore, EvalType, Metric, MetricResult, MetricSummary, Rating, StoreError, Thresholds,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::llm_client::{LLMClient, LLMError};

/// Returned verbatim, without an LLM call, when there is nothing to summarize
pub const NO_FAILURES_MESSAGE: &str = "No specific failures found to summarize. Great job!";

/// Cases quoted per failing metric
pub const MAX_CASES_PER_METRIC: usize = 2;

const PROMPT_PREAMBLE: &str = "You are an expert AI evaluation analyst. Based on the following evaluation results, identify patterns of failure and provide specific, actionable suggestions for improvement. Focus on the reasons provided for the low scores.\n\n";
const PROMPT_CLOSING: &str = "Summary of patterns and suggestions for improvement:";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Failed to read metric report: {0}")]
    Store(#[from] StoreError),

    #[error("Summarizing LLM failed: {0}")]
    Llm(#[from] LLMError),
}

/// Below-pass cases of one metric
#[derive(Debug, Clone)]
pub struct MetricFailures {
    pub metric: Metric,
    pub cases: Vec<MetricResult>,
}

pub struct FailureSummarizer {
    llm_client: Arc<dyn LLMClient>,
    store: ArtifactStore,
    thresholds: Thresholds,
}

impl FailureSummarizer {
    pub fn new(
        llm_client: Arc<dyn LLMClient>,
        store: ArtifactStore,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            llm_client,
            store,
            thresholds,
        }
    }

    /// Read the report artifacts of non-`Good` metrics and keep the scored
    /// cases below the pass threshold. Errored metrics and metrics without a
    /// report are skipped.
    pub fn collect_failures(
        &self,
        eval_type: EvalType,
        summaries: &[(Metric, MetricSummary)],
    ) -> Result<Vec<MetricFailures>, SummaryError> {
        let mut failures = Vec::new();

        for (metric, summary) in summaries {
            if summary.rating == Rating::Good {
                continue;
            }
            // An errored runner wrote no report during this run
            if let Some(error) = &summary.error {
                debug!("Skipping {}: {}", metric, error);
                continue;
            }

            let report_name = ArtifactStore::metric_report_name(*metric, eval_type);
            if !self.store.exists(&report_name) {
                debug!("No report for {}, skipping", metric);
                continue;
            }

            let results: Vec<MetricResult> = self.store.read_json(&report_name)?;
            let cases: Vec<MetricResult> = results
                .into_iter()
                .filter(|r| matches!(r.score, Some(s) if self.thresholds.is_below_pass(s)))
                .collect();

            if !cases.is_empty() {
                failures.push(MetricFailures {
                    metric: *metric,
                    cases,
                });
            }
        }

        Ok(failures)
    }

    pub fn build_prompt(failures: &[MetricFailures]) -> String {
        let mut prompt = String::from(PROMPT_PREAMBLE);
        for failure in failures {
            prompt.push_str(&format!("Metric: {}\n", failure.metric));
            for case in failure.cases.iter().take(MAX_CASES_PER_METRIC) {
                prompt.push_str(&format!(
                    "  - Input: {}\n  - Score: {:.2}\n  - Reason: {}\n",
                    case.input,
                    case.score.unwrap_or_default(),
                    case.reason
                ));
            }
            prompt.push('\n');
        }
        prompt.push_str(PROMPT_CLOSING);
        prompt
    }

    pub async fn summarize(
        &self,
        eval_type: EvalType,
        summaries: &[(Metric, MetricSummary)],
    ) -> Result<String, SummaryError> {
        info!("Generating improvement suggestions");
        let failures = self.collect_failures(eval_type, summaries)?;
        if failures.is_empty() {
            info!("{}", NO_FAILURES_MESSAGE);
            return Ok(NO_FAILURES_MESSAGE.to_string());
        }

        let prompt = Self::build_prompt(&failures);
        let response = self.llm_client.complete(prompt).await?;
        Ok(response.content.trim().to_string())
    }
}
