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

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{EvalType, Metric, Rating, Thresholds};

/// Score record for one (metric, golden) pair
///
/// `score` is `None` when the scorer failed; `reason` then carries the error text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricResult {
    pub input: String,
    pub score: Option<f64>,
    pub reason: String,
}

impl MetricResult {
    pub fn scored(input: impl Into<String>, score: f64, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            score: Some(score),
            reason: reason.into(),
        }
    }

    pub fn failed(input: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            score: None,
            reason: error.into(),
        }
    }
}

/// Mean of the present scores over the count of all results (0 when empty)
pub fn average_score(results: &[MetricResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results.iter().filter_map(|r| r.score).sum();
    total / results.len() as f64
}

/// Per-metric aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSummary {
    /// `None` only when the metric's runner failed as a whole
    pub average_score: Option<f64>,
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricSummary {
    pub fn from_results(results: &[MetricResult], thresholds: &Thresholds) -> Self {
        let average = average_score(results);
        Self {
            average_score: Some(average),
            rating: thresholds.classify(Some(average)),
            error: None,
        }
    }

    /// Summary for a metric whose runner crashed
    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            average_score: None,
            rating: Rating::Error,
            error: Some(error.into()),
        }
    }
}

/// One orchestrator invocation, built up stage by stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRun {
    pub eval_type: EvalType,
    /// Summaries in configured metric order
    pub summaries: Vec<(Metric, MetricSummary)>,
    pub improvement_summary: String,
    pub report_text: String,
    pub report_path: Option<PathBuf>,
}

impl EvaluationRun {
    pub fn new(eval_type: EvalType) -> Self {
        Self {
            eval_type,
            summaries: Vec::new(),
            improvement_summary: String::new(),
            report_text: String::new(),
            report_path: None,
        }
    }

    pub fn summary(&self, metric: Metric) -> Option<&MetricSummary> {
        self.summaries
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, s)| s)
    }
}
