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

//! Ragscope Core
//!
//! Fundamental data structures for the RAG evaluation pipeline: goldens,
//! per-metric results and summaries, rating bands, configuration and the
//! on-disk artifact store shared by every pipeline stage.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod eval_result;
pub mod golden;
pub mod metric;
pub mod rating;

pub use artifacts::ArtifactStore;
pub use config::{
    BackendConfig, EvalProfile, EvaluationConfig, ModelConfig, ProfileConfig, RagConfig,
    Settings,
};
pub use error::{ConfigError, StoreError};
pub use eval_result::{average_score, EvaluationRun, MetricResult, MetricSummary};
pub use golden::{Golden, SynthesisParams};
pub use metric::{EvalType, InvalidEvalType, Metric, UnknownMetric};
pub use rating::{
    Rating, Thresholds, DEFAULT_IMPROVEMENT_THRESHOLD, DEFAULT_PASS_THRESHOLD,
};
