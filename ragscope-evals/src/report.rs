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

//! Fixed-format evaluation report

use ragscope_core::{EvalType, Metric, MetricSummary};

pub const REPORT_HEADER: &str = "--- Final Evaluation Report ---";
pub const SUMMARY_HEADER: &str = "\n--- Improvement Summary ---";
const RULE_WIDTH: usize = 35;
const METRIC_COLUMN_WIDTH: usize = 25;

/// `<metric padded to 25> | Score: <score or Error padded to 5> | <rating>`
pub fn format_row(metric: Metric, summary: &MetricSummary) -> String {
    let score = match summary.average_score {
        Some(score) => format!("{:.2}", score),
        None => "Error".to_string(),
    };
    format!(
        "{:<width$} | Score: {:<5} | {}",
        metric.as_str(),
        score,
        summary.rating.label(),
        width = METRIC_COLUMN_WIDTH
    )
}

/// Render the whole report; rows keep the order of `summaries`
pub fn compose_report(
    eval_type: EvalType,
    summaries: &[(Metric, MetricSummary)],
    improvement_summary: &str,
) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut lines = Vec::with_capacity(summaries.len() + 6);

    lines.push(REPORT_HEADER.to_string());
    lines.push(format!("Mode: {} Eval", eval_type.title()));
    lines.push(rule.clone());
    for (metric, summary) in summaries {
        lines.push(format_row(*metric, summary));
    }
    lines.push(rule);
    lines.push(SUMMARY_HEADER.to_string());
    lines.push(improvement_summary.to_string());

    lines.join("\n")
}
