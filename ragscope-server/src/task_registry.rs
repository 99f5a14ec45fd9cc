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

//! Background task registry
//!
//! Evaluations run detached from the request that started them. Each task
//! moves `starting -> running_<eval_type>_evaluation -> completed | failed`
//! and is polled by id. A submitted task is always queryable while it is
//! pending or running. Finished tasks are reaped once they are older than the
//! retention window, and when the store holds `max_tasks` entries the oldest
//! finished task makes room for the new one.
//!
//! Runs of the same eval type share artifact names, so they are serialized
//! by a per-type lock; a queued task stays `starting` until it holds the lock.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use ragscope_core::EvalType;
use ragscope_evals::EvaluationExecutor;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle state of a background evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Starting,
    Running(EvalType),
    Completed,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Starting => f.write_str("starting"),
            TaskStatus::Running(eval_type) => write!(f, "running_{}_evaluation", eval_type),
            TaskStatus::Completed => f.write_str("completed"),
            TaskStatus::Failed => f.write_str("failed"),
        }
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    pub report_content: String,
}

/// Snapshot of one task as reported by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    finished_at: Option<Instant>,
}

impl Task {
    fn new(task_id: String) -> Self {
        Self {
            task_id,
            status: TaskStatus::Starting,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    fn complete(&mut self, report_content: String) {
        self.status = TaskStatus::Completed;
        self.result = Some(TaskResult { report_content });
        self.finished_at = Some(Instant::now());
    }

    fn fail(&mut self, error: String) {
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Instant::now());
    }

    /// Pending and running tasks never expire
    fn is_expired(&self, retention: Duration) -> bool {
        self.finished_at
            .map_or(false, |finished| finished.elapsed() >= retention)
    }
}

type TaskMap = HashMap<String, Arc<RwLock<Task>>>;

#[derive(Clone)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<TaskMap>>,
    executor: Arc<dyn EvaluationExecutor>,
    type_locks: Arc<HashMap<EvalType, Arc<tokio::sync::Mutex<()>>>>,
    max_tasks: usize,
    retention: Duration,
}

impl TaskRegistry {
    pub fn new(
        executor: Arc<dyn EvaluationExecutor>,
        max_tasks: usize,
        retention: Duration,
    ) -> Self {
        let type_locks = EvalType::ALL
            .iter()
            .map(|eval_type| (*eval_type, Arc::new(tokio::sync::Mutex::new(()))))
            .collect();

        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            executor,
            type_locks: Arc::new(type_locks),
            max_tasks: max_tasks.max(1),
            retention,
        }
    }

    /// Register a task and start it in the background; returns immediately
    pub fn submit(&self, eval_type: EvalType) -> String {
        let task_id = Uuid::new_v4().to_string();
        let task = Arc::new(RwLock::new(Task::new(task_id.clone())));
        self.insert(task_id.clone(), Arc::clone(&task));

        let executor = Arc::clone(&self.executor);
        let type_lock = self
            .type_locks
            .get(&eval_type)
            .cloned()
            .unwrap_or_else(|| Arc::new(tokio::sync::Mutex::new(())));
        let id = task_id.clone();

        tokio::spawn(async move {
            let _guard = type_lock.lock().await;
            task.write().status = TaskStatus::Running(eval_type);
            info!("Task {} running {} evaluation", id, eval_type);

            // Run on its own task so a panic is observed as a JoinError
            let outcome = tokio::spawn(async move { executor.execute(eval_type).await }).await;

            let mut task = task.write();
            match outcome {
                Ok(Ok(run)) => {
                    info!("Task {} completed", id);
                    task.complete(run.report_text);
                }
                Ok(Err(e)) => {
                    error!("Task {} failed: {}", id, e);
                    task.fail(e.to_string());
                }
                Err(join_err) => {
                    error!("Task {} panicked: {}", id, join_err);
                    task.fail(format!("evaluation panicked: {}", join_err));
                }
            }
        });

        task_id
    }

    /// Snapshot of a task, or `None` if unknown or reaped
    pub fn get(&self, task_id: &str) -> Option<Task> {
        let task = self.tasks.read().get(task_id)?.read().clone();
        if task.is_expired(self.retention) {
            return None;
        }
        Some(task)
    }

    fn insert(&self, task_id: String, task: Arc<RwLock<Task>>) {
        let mut tasks = self.tasks.write();

        let before = tasks.len();
        tasks.retain(|_, task| !task.read().is_expired(self.retention));
        if tasks.len() < before {
            debug!("Reaped {} expired task(s)", before - tasks.len());
        }

        while tasks.len() >= self.max_tasks {
            if !evict_oldest_finished(&mut tasks) {
                warn!(
                    "Task store over capacity: {} tasks still pending or running",
                    tasks.len()
                );
                break;
            }
        }

        tasks.insert(task_id, task);
    }
}

/// Remove the finished task that finished first; false if none has finished
fn evict_oldest_finished(tasks: &mut TaskMap) -> bool {
    let oldest = tasks
        .iter()
        .filter_map(|(id, task)| task.read().finished_at.map(|at| (at, id.clone())))
        .min();

    match oldest {
        Some((_, id)) => {
            debug!("Evicting finished task {}", id);
            tasks.remove(&id);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragscope_core::EvaluationRun;
    use ragscope_evals::PipelineError;
    use tokio::sync::Semaphore;

    /// Blocks each execution until a permit is released
    struct GatedExecutor {
        gate: Arc<Semaphore>,
        fail: bool,
    }

    #[async_trait]
    impl EvaluationExecutor for GatedExecutor {
        async fn execute(&self, eval_type: EvalType) -> Result<EvaluationRun, PipelineError> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| PipelineError::Setup(e.to_string()))?;
            permit.forget();
            if self.fail {
                return Err(PipelineError::NoGoldens);
            }
            let mut run = EvaluationRun::new(eval_type);
            run.report_text = format!(
                "--- Final Evaluation Report ---\nMode: {} Eval",
                eval_type.title()
            );
            Ok(run)
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl EvaluationExecutor for PanickingExecutor {
        async fn execute(&self, _eval_type: EvalType) -> Result<EvaluationRun, PipelineError> {
            panic!("scorer blew up");
        }
    }

    fn registry(executor: Arc<dyn EvaluationExecutor>) -> TaskRegistry {
        TaskRegistry::new(executor, 100, Duration::from_secs(60))
    }

    async fn wait_for(registry: &TaskRegistry, task_id: &str, status: TaskStatus) -> Task {
        for _ in 0..200 {
            if let Some(task) = registry.get(task_id) {
                if task.status == status {
                    return task;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} never reached {}", task_id, status);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(TaskStatus::Running(EvalType::Deep)).unwrap();
        assert_eq!(json, serde_json::json!("running_deep_evaluation"));
        assert_eq!(TaskStatus::Starting.to_string(), "starting");
    }

    #[tokio::test]
    async fn test_task_lifecycle_to_completed() {
        let gate = Arc::new(Semaphore::new(0));
        let registry = registry(Arc::new(GatedExecutor {
            gate: gate.clone(),
            fail: false,
        }));

        let task_id = registry.submit(EvalType::Quick);
        let task = registry.get(&task_id).unwrap();
        assert!(matches!(task.status, TaskStatus::Starting | TaskStatus::Running(_)));
        assert!(task.result.is_none());

        wait_for(&registry, &task_id, TaskStatus::Running(EvalType::Quick)).await;
        gate.add_permits(1);
        let task = wait_for(&registry, &task_id, TaskStatus::Completed).await;

        assert_eq!(
            task.result.unwrap().report_content,
            "--- Final Evaluation Report ---\nMode: Quick Eval"
        );
        assert!(task.error.is_none());
    }

    #[tokio::test]
    async fn test_executor_error_becomes_failed() {
        let gate = Arc::new(Semaphore::new(1));
        let registry = registry(Arc::new(GatedExecutor { gate, fail: true }));

        let task_id = registry.submit(EvalType::Deep);
        let task = wait_for(&registry, &task_id, TaskStatus::Failed).await;

        assert_eq!(
            task.error.as_deref(),
            Some("Golden generation produced no goldens")
        );
        assert!(task.result.is_none());
    }

    #[tokio::test]
    async fn test_panicking_executor_becomes_failed() {
        let registry = registry(Arc::new(PanickingExecutor));
        let task_id = registry.submit(EvalType::Quick);
        let task = wait_for(&registry, &task_id, TaskStatus::Failed).await;
        assert!(task.error.unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn test_same_type_runs_are_serialized() {
        let gate = Arc::new(Semaphore::new(0));
        let registry = registry(Arc::new(GatedExecutor {
            gate: gate.clone(),
            fail: false,
        }));

        let first = registry.submit(EvalType::Quick);
        wait_for(&registry, &first, TaskStatus::Running(EvalType::Quick)).await;

        let second = registry.submit(EvalType::Quick);
        let other_type = registry.submit(EvalType::Deep);
        wait_for(&registry, &other_type, TaskStatus::Running(EvalType::Deep)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.get(&second).unwrap().status, TaskStatus::Starting);

        gate.add_permits(3);
        wait_for(&registry, &first, TaskStatus::Completed).await;
        wait_for(&registry, &second, TaskStatus::Completed).await;
        wait_for(&registry, &other_type, TaskStatus::Completed).await;
    }

    #[tokio::test]
    async fn test_unknown_and_expired_tasks_are_not_found() {
        let gate = Arc::new(Semaphore::new(1));
        let registry = TaskRegistry::new(
            Arc::new(GatedExecutor { gate, fail: false }),
            100,
            Duration::from_millis(200),
        );
        assert!(registry.get("no-such-task").is_none());

        let task_id = registry.submit(EvalType::Quick);
        wait_for(&registry, &task_id, TaskStatus::Completed).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(registry.get(&task_id).is_none());
    }

    #[tokio::test]
    async fn test_running_task_outlives_retention() {
        let gate = Arc::new(Semaphore::new(0));
        let registry = TaskRegistry::new(
            Arc::new(GatedExecutor {
                gate: gate.clone(),
                fail: false,
            }),
            100,
            Duration::from_millis(50),
        );

        let task_id = registry.submit(EvalType::Deep);
        wait_for(&registry, &task_id, TaskStatus::Running(EvalType::Deep)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        // A later submission reaps expired entries
        registry.submit(EvalType::Quick);
        assert_eq!(
            registry.get(&task_id).unwrap().status,
            TaskStatus::Running(EvalType::Deep)
        );

        gate.add_permits(2);
        wait_for(&registry, &task_id, TaskStatus::Completed).await;
    }

    #[tokio::test]
    async fn test_full_store_keeps_new_and_active_tasks() {
        let gate = Arc::new(Semaphore::new(0));
        let registry = TaskRegistry::new(
            Arc::new(GatedExecutor {
                gate: gate.clone(),
                fail: false,
            }),
            2,
            Duration::from_secs(600),
        );

        let a = registry.submit(EvalType::Quick);
        let b = registry.submit(EvalType::Deep);
        for _ in 0..20 {
            registry.get(&a);
            registry.get(&b);
        }

        // Nothing has finished, so nothing may be evicted
        let c = registry.submit(EvalType::Quick);
        assert!(registry.get(&a).is_some());
        assert!(registry.get(&b).is_some());
        assert!(registry.get(&c).is_some());

        gate.add_permits(3);
        for id in [&a, &b, &c] {
            wait_for(&registry, id, TaskStatus::Completed).await;
        }

        // Finished tasks give way to the new one
        let d = registry.submit(EvalType::Deep);
        assert!(registry.get(&d).is_some());
        let survivors = [&a, &b, &c]
            .iter()
            .filter(|id| registry.get(id).is_some())
            .count();
        assert_eq!(survivors, 1);
        assert_eq!(registry.tasks.read().len(), 2);
    }
}
