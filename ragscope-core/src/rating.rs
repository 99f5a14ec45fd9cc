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

//! Discrete quality bands derived from an average metric score

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PASS_THRESHOLD: f64 = 0.8;
pub const DEFAULT_IMPROVEMENT_THRESHOLD: f64 = 0.5;

/// Quality band for a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Error,
    Good,
    NeedsImprovement,
    Failure,
}

impl Rating {
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Error => "[Error]",
            Rating::Good => "[Good]",
            Rating::NeedsImprovement => "[Needs Improvement]",
            Rating::Failure => "[Failure]",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pass and improvement thresholds; both bounds are inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub pass: f64,
    pub improvement: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pass: DEFAULT_PASS_THRESHOLD,
            improvement: DEFAULT_IMPROVEMENT_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(pass: f64, improvement: f64) -> Self {
        Self { pass, improvement }
    }

    /// Map a score to its rating band
    pub fn classify(&self, score: Option<f64>) -> Rating {
        match score {
            None => Rating::Error,
            Some(s) if s >= self.pass => Rating::Good,
            Some(s) if s >= self.improvement => Rating::NeedsImprovement,
            Some(_) => Rating::Failure,
        }
    }

    /// Whether a single case score counts as a failure for summarization
    pub fn is_below_pass(&self, score: f64) -> bool {
        score < self.pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries_are_closed_above() {
        let t = Thresholds::default();
        assert_eq!(t.classify(Some(0.8)), Rating::Good);
        assert_eq!(t.classify(Some(0.7999)), Rating::NeedsImprovement);
        assert_eq!(t.classify(Some(0.5)), Rating::NeedsImprovement);
        assert_eq!(t.classify(Some(0.4999)), Rating::Failure);
        assert_eq!(t.classify(None), Rating::Error);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Rating::NeedsImprovement.to_string(), "[Needs Improvement]");
        assert_eq!(Rating::Error.label(), "[Error]");
    }

    #[test]
    fn test_custom_thresholds() {
        let t = Thresholds::new(0.9, 0.6);
        assert_eq!(t.classify(Some(0.85)), Rating::NeedsImprovement);
        assert_eq!(t.classify(Some(0.55)), Rating::Failure);
    }

    proptest! {
        #[test]
        fn prop_present_scores_never_rate_error(score in 0.0f64..=1.0) {
            let t = Thresholds::default();
            let rating = t.classify(Some(score));
            prop_assert_ne!(rating, Rating::Error);
            let expected = if score >= 0.8 {
                Rating::Good
            } else if score >= 0.5 {
                Rating::NeedsImprovement
            } else {
                Rating::Failure
            };
            prop_assert_eq!(rating, expected);
        }
    }
}
