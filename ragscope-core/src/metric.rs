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

//! Evaluation modes and the named quality metrics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Evaluation mode; each mode owns its golden files and synthesis parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalType {
    Quick,
    Deep,
}

impl EvalType {
    pub const ALL: [EvalType; 2] = [EvalType::Quick, EvalType::Deep];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvalType::Quick => "quick",
            EvalType::Deep => "deep",
        }
    }

    /// Title-cased name used in the report's mode line
    pub fn title(&self) -> &'static str {
        match self {
            EvalType::Quick => "Quick",
            EvalType::Deep => "Deep",
        }
    }
}

impl fmt::Display for EvalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid evaluation type: {0}")]
pub struct InvalidEvalType(pub String);

impl FromStr for EvalType {
    type Err = InvalidEvalType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(EvalType::Quick),
            "deep" => Ok(EvalType::Deep),
            other => Err(InvalidEvalType(other.to_string())),
        }
    }
}

/// A named scoring dimension judged per golden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AnswerRelevancy,
    Faithfulness,
    ContextualPrecision,
    ContextualRecall,
    ContextualRelevancy,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::AnswerRelevancy,
        Metric::Faithfulness,
        Metric::ContextualPrecision,
        Metric::ContextualRecall,
        Metric::ContextualRelevancy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::AnswerRelevancy => "answer_relevancy",
            Metric::Faithfulness => "faithfulness",
            Metric::ContextualPrecision => "contextual_precision",
            Metric::ContextualRecall => "contextual_recall",
            Metric::ContextualRelevancy => "contextual_relevancy",
        }
    }

    /// Whether the metric compares against the golden's expected output
    pub fn needs_expected_output(&self) -> bool {
        matches!(self, Metric::ContextualPrecision | Metric::ContextualRecall)
    }

    /// Whether the metric inspects the retrieved passages
    pub fn needs_retrieval_context(&self) -> bool {
        !matches!(self, Metric::AnswerRelevancy)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}
