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

//! Concrete collaborator adapters

pub mod http_responder;
pub mod llm_judge;
pub mod synthesizer;

pub use http_responder::HttpRagResponder;
pub use llm_judge::LlmJudgeScorer;
pub use synthesizer::{split_contexts, LlmGoldenSynthesizer, SIMILARITY_THRESHOLD};
