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

/// One evaluation unit
///
/// Created by the golden generator, filled in once by the RAG responder
/// (`actual_output`, `retrieval_context`) and read-only afterwards. A golden
/// has no id; its position in the golden file identifies it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Golden {
    /// Question text
    pub input: String,

    /// Reference answer (optional)
    #[serde(default)]
    pub expected_output: Option<String>,

    /// Answer produced by the RAG responder
    #[serde(default)]
    pub actual_output: Option<String>,

    /// Passages retrieved by the RAG responder, in retrieval order
    #[serde(default)]
    pub retrieval_context: Vec<String>,

    /// Source passages the generator built the question from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl Golden {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Record the RAG responder's answer and retrieved passages
    pub fn augment(&mut self, answer: String, retrieval_context: Vec<String>) {
        self.actual_output = Some(answer);
        self.retrieval_context = retrieval_context;
    }
}

/// Golden synthesis parameters bound to an eval type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisParams {
    pub max_goldens_per_context: usize,
    pub num_evolutions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_accepts_sparse_json() {
        let golden: Golden = serde_json::from_str(
            r#"{"input": "What is covered?", "additional_metadata": {"k": 1}}"#,
        )
        .unwrap();
        assert_eq!(golden.input, "What is covered?");
        assert!(golden.expected_output.is_none());
        assert!(golden.retrieval_context.is_empty());
    }

    #[test]
    fn test_augment() {
        let mut golden = Golden::new("q").with_expected_output("a");
        golden.augment("answer".to_string(), vec!["p1".to_string()]);
        assert_eq!(golden.actual_output.as_deref(), Some("answer"));
        assert_eq!(golden.retrieval_context, vec!["p1".to_string()]);
    }
}
