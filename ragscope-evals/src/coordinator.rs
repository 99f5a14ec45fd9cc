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

//! Parallel evaluation coordinator
//!
//! Launches one metric runner per configured metric, waits for all of them
//! and returns the summaries in configured order. A runner that errors,
//! panics or (in the subprocess backend) exits non-zero yields an `Error`
//! rated summary for its metric; the other metrics are unaffected. Each
//! metric's previous report is removed before its worker starts.

use futures::future::join_all;
use ragscope_core::{
    ArtifactStore, BackendConfig, Golden, Metric, MetricResult, MetricSummary,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tracing::{error, info};

use crate::runner::MetricRunner;

pub struct Coordinator {
    runner: Arc<MetricRunner>,
    backend: BackendConfig,
    config_path: Option<PathBuf>,
}

impl Coordinator {
    pub fn new(runner: Arc<MetricRunner>, backend: BackendConfig) -> Self {
        Self {
            runner,
            backend,
            config_path: None,
        }
    }

    /// Configuration file handed to subprocess workers
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Score `test_cases` (persisted as `goldens_name`) against every metric
    pub async fn run_all(
        &self,
        metrics: &[Metric],
        goldens_name: &str,
        test_cases: Arc<Vec<Golden>>,
    ) -> Vec<(Metric, MetricSummary)> {
        info!(
            "Starting {} metric evaluation(s) over {} test case(s)",
            metrics.len(),
            test_cases.len()
        );

        let summaries = match &self.backend {
            BackendConfig::InProcess => self.run_in_process(metrics, test_cases).await,
            BackendConfig::Subprocess { program } => {
                self.run_subprocesses(program, metrics, goldens_name).await
            }
        };

        metrics.iter().copied().zip(summaries).collect()
    }

    async fn run_in_process(
        &self,
        metrics: &[Metric],
        test_cases: Arc<Vec<Golden>>,
    ) -> Vec<MetricSummary> {
        let handles: Vec<_> = metrics
            .iter()
            .map(|&metric| {
                let runner = Arc::clone(&self.runner);
                let cases = Arc::clone(&test_cases);
                tokio::spawn(async move {
                    runner.clear_report(metric)?;
                    runner.run(metric, &cases).await
                })
            })
            .collect();

        let joined = join_all(handles).await;

        metrics
            .iter()
            .zip(joined)
            .map(|(metric, result)| match result {
                Ok(Ok(outcome)) => outcome.summary,
                Ok(Err(e)) => {
                    error!("Metric runner for {} failed: {}", metric, e);
                    MetricSummary::errored(e.to_string())
                }
                Err(join_err) => {
                    error!("Metric runner for {} panicked: {}", metric, join_err);
                    MetricSummary::errored(format!("metric runner panicked: {}", join_err))
                }
            })
            .collect()
    }

    async fn run_subprocesses(
        &self,
        program: &Path,
        metrics: &[Metric],
        goldens_name: &str,
    ) -> Vec<MetricSummary> {
        let workers = metrics
            .iter()
            .map(|&metric| self.run_worker(program, metric, goldens_name));
        join_all(workers).await
    }

    async fn run_worker(
        &self,
        program: &Path,
        metric: Metric,
        goldens_name: &str,
    ) -> MetricSummary {
        let store = self.runner.store();
        let eval_type = self.runner.eval_type();
        let report_name = ArtifactStore::metric_report_name(metric, eval_type);

        // The report is read back only if the worker wrote it during this run
        if let Err(e) = self.runner.clear_report(metric) {
            error!("Failed to clear previous report for {}: {}", metric, e);
            return MetricSummary::errored(e.to_string());
        }

        let mut command = tokio::process::Command::new(program);
        command
            .arg("score-metric")
            .arg(metric.as_str())
            .arg("--eval-type")
            .arg(eval_type.as_str())
            .arg("--goldens")
            .arg(store.path(goldens_name))
            .arg("--report")
            .arg(store.path(&report_name))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(config) = &self.config_path {
            command.arg("--config").arg(config);
        }

        info!("Launching worker for {}: {:?}", metric, program);
        let status = match command.status().await {
            Ok(status) => status,
            Err(e) => {
                error!("Failed to launch worker for {}: {}", metric, e);
                return MetricSummary::errored(format!("failed to launch worker: {}", e));
            }
        };

        if !status.success() {
            error!("Worker for {} exited with {}", metric, status);
            return MetricSummary::errored(format!("worker exited with {}", status));
        }

        match store.read_json::<Vec<MetricResult>>(&report_name) {
            Ok(results) => MetricSummary::from_results(&results, &self.runner.thresholds()),
            Err(e) => {
                error!("Worker for {} left no readable report: {}", metric, e);
                MetricSummary::errored(e.to_string())
            }
        }
    }
}
