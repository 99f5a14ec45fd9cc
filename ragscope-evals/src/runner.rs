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

//! Metric runner: scores every test case against one metric
//!
//! Each case gets exactly one scorer attempt. A failing case never aborts
//! the run; it is recorded with an absent score and the error text as its
//! reason. The per-case results are written to the metric's report artifact
//! before the summary is returned.

use ragscope_core::{
    ArtifactStore, EvalType, Golden, Metric, MetricResult, MetricSummary, StoreError, Thresholds,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::collaborators::MetricScorer;

/// Errors that abort a metric runner as a whole
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to write metric report: {0}")]
    Store(#[from] StoreError),
}

/// Per-case results and aggregate for one metric
#[derive(Debug, Clone)]
pub struct MetricOutcome {
    pub metric: Metric,
    pub results: Vec<MetricResult>,
    pub summary: MetricSummary,
    pub report_path: PathBuf,
}

pub struct MetricRunner {
    scorer: Arc<dyn MetricScorer>,
    store: ArtifactStore,
    thresholds: Thresholds,
    eval_type: EvalType,
}

impl MetricRunner {
    pub fn new(
        scorer: Arc<dyn MetricScorer>,
        store: ArtifactStore,
        thresholds: Thresholds,
        eval_type: EvalType,
    ) -> Self {
        Self {
            scorer,
            store,
            thresholds,
            eval_type,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn eval_type(&self) -> EvalType {
        self.eval_type
    }

    /// Remove the report a previous run left for `metric`
    pub fn clear_report(&self, metric: Metric) -> Result<(), StoreError> {
        self.store
            .remove(&ArtifactStore::metric_report_name(metric, self.eval_type))
    }

    /// Score all cases and write `{metric}_{eval_type}_report.json`
    pub async fn run(
        &self,
        metric: Metric,
        test_cases: &[Golden],
    ) -> Result<MetricOutcome, RunnerError> {
        let report_name = ArtifactStore::metric_report_name(metric, self.eval_type);
        self.run_into(metric, test_cases, &report_name).await
    }

    /// Score all cases and write the results under `report_name`
    pub async fn run_into(
        &self,
        metric: Metric,
        test_cases: &[Golden],
        report_name: &str,
    ) -> Result<MetricOutcome, RunnerError> {
        info!("Evaluating metric: {} ({} cases)", metric, test_cases.len());
        let total = test_cases.len();
        let mut results = Vec::with_capacity(total);

        for (i, case) in test_cases.iter().enumerate() {
            let verdict = match self.scorer.score(metric, case).await {
                Ok(score) => score.validate(),
                Err(e) => Err(e),
            };

            match verdict {
                Ok(score) => {
                    info!("  - Scored test case {}/{}: {:.2}", i + 1, total, score.score);
                    results.push(MetricResult::scored(&case.input, score.score, score.reason));
                }
                Err(e) => {
                    warn!("  - [Error] scoring test case {}/{}: {}", i + 1, total, e);
                    results.push(MetricResult::failed(&case.input, e.to_string()));
                }
            }
        }

        let report_path = self.store.write_json(report_name, &results)?;
        let summary = MetricSummary::from_results(&results, &self.thresholds);
        info!(
            "{} average score {:.2} {} (report {:?})",
            metric,
            summary.average_score.unwrap_or_default(),
            summary.rating,
            report_path
        );

        Ok(MetricOutcome {
            metric,
            results,
            summary,
            report_path,
        })
    }
}
