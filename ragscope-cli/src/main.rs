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

//! Ragscope CLI
//!
//! `ragscope run <quick|deep>` executes a full evaluation in the foreground.
//! `ragscope score-metric` is the isolated worker launched once per metric by
//! the subprocess backend.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragscope_core::{ArtifactStore, EvalType, Golden, Metric, Settings};
use ragscope_evals::evaluators::LlmJudgeScorer;
use ragscope_evals::{EvaluationExecutor, MetricRunner, MetricScorer, OllamaClient, Pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "ragscope")]
#[command(about = "Ragscope - RAG evaluation pipeline", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "RAGSCOPE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full evaluation and print the report
    Run {
        /// Evaluation type (quick or deep)
        eval_type: EvalType,

        /// Artifact directory (overrides config file)
        #[arg(long)]
        artifact_dir: Option<PathBuf>,

        /// Print the run as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Score one metric over a goldens file and write its report
    ScoreMetric {
        /// Metric name
        metric: Metric,

        /// Evaluation type the report belongs to
        #[arg(long)]
        eval_type: EvalType,

        /// Goldens file augmented with RAG output
        #[arg(long)]
        goldens: PathBuf,

        /// Where to write the per-case report
        #[arg(long)]
        report: PathBuf,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "ragscope_cli=debug,ragscope_evals=debug"
    } else {
        "ragscope_cli=info,ragscope_evals=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so stdout carries only the report
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Split a file path into an artifact store rooted at its directory and its file name
fn store_for(path: &Path) -> Result<(ArtifactStore, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid file path {:?}", path))?
        .to_string();
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    Ok((ArtifactStore::new(dir), name))
}

/// LLM judge over the configured generation model; the worker needs nothing else
fn judge_scorer(settings: &Settings) -> Result<Arc<dyn MetricScorer>> {
    let models = &settings.models;
    let llm = OllamaClient::new(
        models.ollama_base_url.clone(),
        models.generation_model.clone(),
        Duration::from_secs(models.request_timeout_secs),
    )
    .context("failed to build judge client")?;
    Ok(Arc::new(LlmJudgeScorer::new(Arc::new(llm))))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            eval_type,
            artifact_dir,
            json,
        } => {
            if let Some(dir) = artifact_dir {
                settings.evaluation.artifact_dir = dir;
            }
            settings.validate()?;

            let config_path = cli.config.filter(|p| p.exists());
            let pipeline = Pipeline::from_settings(&settings, config_path)?;
            let run = pipeline
                .execute(eval_type)
                .await
                .with_context(|| format!("{} evaluation failed", eval_type))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            } else {
                println!("\n\n{}", run.report_text);
                if let Some(path) = &run.report_path {
                    println!("\n[+] Full report saved to '{}'", path.display());
                }
            }
        }

        Commands::ScoreMetric {
            metric,
            eval_type,
            goldens,
            report,
        } => {
            let scorer = judge_scorer(&settings)?;

            let (goldens_store, goldens_name) = store_for(&goldens)?;
            let cases: Vec<Golden> = goldens_store
                .read_json(&goldens_name)
                .with_context(|| format!("failed to load goldens from {:?}", goldens))?;

            let (report_store, report_name) = store_for(&report)?;
            let runner = MetricRunner::new(
                scorer,
                report_store,
                settings.evaluation.thresholds(),
                eval_type,
            );
            let outcome = runner.run_into(metric, &cases, &report_name).await?;

            info!("Detailed report saved to {:?}", outcome.report_path);
            println!(
                "Average Score: {}",
                outcome.summary.average_score.unwrap_or_default()
            );
        }
    }

    Ok(())
}
