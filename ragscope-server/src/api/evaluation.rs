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

//! Evaluation task endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use ragscope_core::EvalType;
use serde::Serialize;
use tracing::info;

use crate::api::{ApiError, AppState};
use crate::task_registry::Task;

#[derive(Debug, Serialize)]
pub struct RunEvaluationResponse {
    pub task_id: String,
}

/// POST /api/run-evaluation/:eval_type - start a background evaluation
pub async fn run_evaluation(
    State(state): State<AppState>,
    Path(eval_type): Path<String>,
) -> Result<Json<RunEvaluationResponse>, ApiError> {
    let eval_type: EvalType = eval_type
        .parse()
        .map_err(|e: ragscope_core::InvalidEvalType| ApiError::BadRequest(e.to_string()))?;

    let task_id = state.registry.submit(eval_type);
    info!("Submitted {} evaluation as task {}", eval_type, task_id);

    Ok(Json(RunEvaluationResponse { task_id }))
}

/// GET /api/status/:task_id - poll a task
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state
        .registry
        .get(&task_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}
