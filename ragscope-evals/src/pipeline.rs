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

//! Pipeline orchestrator
//!
//! One `execute` call runs a full evaluation for an eval type:
//!
//! 1. acquire goldens (cached in the profile's goldens file)
//! 2. augment them with RAG answers (cached in the profile's
//!    goldens-with-output file)
//! 3. score every configured metric through the coordinator
//! 4. compose the report
//! 5. append the failure summary
//! 6. persist the report under a timestamped name
//!
//! Stages 1 and 2 are skipped when their artifact already exists, so a
//! rerun only repeats scoring, summarization and reporting.

use async_trait::async_trait;
use chrono::Local;
use ragscope_core::{
    ArtifactStore, EvalProfile, EvalType, EvaluationRun, Golden, Settings, StoreError,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::{
    collaborators::{GoldenGenerator, MetricScorer, RagResponder},
    coordinator::Coordinator,
    evaluators::{HttpRagResponder, LlmGoldenSynthesizer, LlmJudgeScorer},
    llm_client::{EmbeddingClient, LLMClient, OllamaClient},
    report::compose_report,
    runner::MetricRunner,
    summarizer::{FailureSummarizer, SummaryError},
    EvalError,
};

/// Stage failures that abort a run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Golden generation failed: {0}")]
    Generation(#[source] EvalError),

    #[error("Golden generation produced no goldens")]
    NoGoldens,

    #[error("RAG responder failed on golden {index}: {source}")]
    Rag {
        index: usize,
        #[source]
        source: EvalError,
    },

    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failure summarization failed: {0}")]
    Summary(#[from] SummaryError),

    #[error("Pipeline setup failed: {0}")]
    Setup(String),
}

/// Anything that can run a full evaluation for an eval type
#[async_trait]
pub trait EvaluationExecutor: Send + Sync {
    async fn execute(&self, eval_type: EvalType) -> Result<EvaluationRun, PipelineError>;
}

pub struct Pipeline {
    settings: Settings,
    generator: Arc<dyn GoldenGenerator>,
    responder: Arc<dyn RagResponder>,
    scorer: Arc<dyn MetricScorer>,
    summarizer_llm: Arc<dyn LLMClient>,
    config_path: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        generator: Arc<dyn GoldenGenerator>,
        responder: Arc<dyn RagResponder>,
        scorer: Arc<dyn MetricScorer>,
        summarizer_llm: Arc<dyn LLMClient>,
    ) -> Self {
        Self {
            settings,
            generator,
            responder,
            scorer,
            summarizer_llm,
            config_path: None,
        }
    }

    /// Wire the Ollama-backed synthesizer, judge and summarizer plus the
    /// HTTP RAG responder from configuration
    pub fn from_settings(
        settings: &Settings,
        config_path: Option<PathBuf>,
    ) -> Result<Self, PipelineError> {
        let models = &settings.models;
        let timeout = Duration::from_secs(models.request_timeout_secs);

        let llm: Arc<dyn LLMClient> = Arc::new(
            OllamaClient::new(
                models.ollama_base_url.clone(),
                models.generation_model.clone(),
                timeout,
            )
            .map_err(|e| PipelineError::Setup(e.to_string()))?,
        );

        let mut synthesizer = LlmGoldenSynthesizer::new(Arc::clone(&llm));
        if let Some(embedding_model) = &models.embedding_model {
            let embedder: Arc<dyn EmbeddingClient> = Arc::new(
                OllamaClient::new(
                    models.ollama_base_url.clone(),
                    embedding_model.clone(),
                    timeout,
                )
                .map_err(|e| PipelineError::Setup(e.to_string()))?,
            );
            synthesizer = synthesizer.with_embedding_client(embedder);
        }

        let mut responder = HttpRagResponder::new(&settings.rag.endpoint)
            .map_err(|e| PipelineError::Setup(e.to_string()))?
            .with_timeout(Duration::from_secs(settings.rag.timeout_secs));
        if let Some(api_key) = settings.rag.api_key.as_deref().filter(|k| !k.is_empty()) {
            responder = responder.with_api_key(api_key);
        }

        info!(
            "Pipeline models: generation={} embedding={:?} rag={}",
            models.generation_model, models.embedding_model, settings.rag.endpoint
        );

        let mut pipeline = Self::new(
            settings.clone(),
            Arc::new(synthesizer),
            Arc::new(responder),
            Arc::new(LlmJudgeScorer::new(Arc::clone(&llm))),
            llm,
        );
        pipeline.config_path = config_path;
        Ok(pipeline)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.settings.evaluation.artifact_dir)
    }

    async fn acquire_goldens(
        &self,
        store: &ArtifactStore,
        profile: &EvalProfile,
    ) -> Result<Vec<Golden>, PipelineError> {
        if store.exists(&profile.goldens_file) {
            info!(
                "Found existing '{}'. Skipping generation.",
                profile.goldens_file
            );
            return Ok(store.read_json(&profile.goldens_file)?);
        }

        info!("'{}' not found. Running synthesizer...", profile.goldens_file);
        let goldens = self
            .generator
            .generate(&self.settings.evaluation.source_document, profile.synthesis())
            .await
            .map_err(PipelineError::Generation)?;
        if goldens.is_empty() {
            return Err(PipelineError::NoGoldens);
        }

        store.write_json(&profile.goldens_file, &goldens)?;
        info!(
            "Generation complete. {} goldens saved to '{}'",
            goldens.len(),
            profile.goldens_file
        );
        Ok(goldens)
    }

    async fn augment_goldens(
        &self,
        store: &ArtifactStore,
        profile: &EvalProfile,
        goldens: Vec<Golden>,
    ) -> Result<Vec<Golden>, PipelineError> {
        if store.exists(&profile.goldens_with_output_file) {
            info!(
                "Found existing '{}'. Skipping RAG agent execution.",
                profile.goldens_with_output_file
            );
            return Ok(store.read_json(&profile.goldens_with_output_file)?);
        }

        info!(
            "'{}' not found. Running RAG agent...",
            profile.goldens_with_output_file
        );
        let total = goldens.len();
        let mut augmented = Vec::with_capacity(total);
        for (index, mut golden) in goldens.into_iter().enumerate() {
            let response = self
                .responder
                .respond(&golden.input)
                .await
                .map_err(|source| PipelineError::Rag { index, source })?;
            golden.augment(response.answer, response.context);
            info!("  - Generated RAG response {}/{}", index + 1, total);
            augmented.push(golden);
        }

        store.write_json(&profile.goldens_with_output_file, &augmented)?;
        Ok(augmented)
    }
}

#[async_trait]
impl EvaluationExecutor for Pipeline {
    async fn execute(&self, eval_type: EvalType) -> Result<EvaluationRun, PipelineError> {
        let evaluation = &self.settings.evaluation;
        let profile = evaluation.profile(eval_type);
        let thresholds = evaluation.thresholds();
        let store = self.store();
        info!("Starting {} evaluation in {:?}", eval_type, store.root());

        let goldens = self.acquire_goldens(&store, profile).await?;
        let augmented = self.augment_goldens(&store, profile, goldens).await?;

        let runner = Arc::new(MetricRunner::new(
            Arc::clone(&self.scorer),
            store.clone(),
            thresholds,
            eval_type,
        ));
        let coordinator = Coordinator::new(runner, evaluation.backend.clone())
            .with_config_path(self.config_path.clone());
        let summaries = coordinator
            .run_all(
                &evaluation.metrics,
                &profile.goldens_with_output_file,
                Arc::new(augmented),
            )
            .await;

        let improvement_summary =
            FailureSummarizer::new(Arc::clone(&self.summarizer_llm), store.clone(), thresholds)
                .summarize(eval_type, &summaries)
                .await?;

        let report_text = compose_report(eval_type, &summaries, &improvement_summary);
        let report_name = ArtifactStore::final_report_name(eval_type, Local::now());
        let report_path = store.write_text(&report_name, &report_text)?;
        info!("Full report saved to {:?}", report_path);

        Ok(EvaluationRun {
            eval_type,
            summaries,
            improvement_summary,
            report_text,
            report_path: Some(report_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        EchoResponder, FakeGenerator, PanickingScorer, RecordingLLM, ScriptedScorer,
    };
    use crate::summarizer::NO_FAILURES_MESSAGE;
    use ragscope_core::{Metric, Rating};
    use std::path::Path;

    struct Fixture {
        generator: Arc<FakeGenerator>,
        responder: Arc<EchoResponder>,
        scorer: Arc<ScriptedScorer>,
        llm: Arc<RecordingLLM>,
    }

    impl Fixture {
        fn new(inputs: &[&str]) -> Self {
            Self {
                generator: Arc::new(FakeGenerator::new(inputs)),
                responder: Arc::new(EchoResponder::default()),
                scorer: Arc::new(
                    ScriptedScorer::default()
                        .score_for("good question", 0.9)
                        .score_for("bad question", 0.3),
                ),
                llm: Arc::new(RecordingLLM::new("Tighten retrieval for pricing questions.")),
            }
        }

        fn pipeline(&self, dir: &Path, metrics: Vec<Metric>) -> Pipeline {
            let mut settings = Settings::default();
            settings.evaluation.artifact_dir = dir.to_path_buf();
            settings.evaluation.metrics = metrics;
            Pipeline::new(
                settings,
                self.generator.clone(),
                self.responder.clone(),
                self.scorer.clone(),
                self.llm.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_end_to_end_quick_run() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&["good question", "bad question"]);
        let pipeline = fixture.pipeline(dir.path(), vec![Metric::AnswerRelevancy]);

        let run = pipeline.execute(EvalType::Quick).await.unwrap();

        let summary = run.summary(Metric::AnswerRelevancy).unwrap();
        assert!((summary.average_score.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(summary.rating, Rating::NeedsImprovement);
        assert!(run
            .report_text
            .contains("answer_relevancy          | Score: 0.60  | [Needs Improvement]"));
        assert!(run.report_text.starts_with("--- Final Evaluation Report ---\nMode: Quick Eval\n"));
        assert!(run.report_text.ends_with(
            "\n--- Improvement Summary ---\nTighten retrieval for pricing questions."
        ));

        let prompts = fixture.llm.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("  - Input: bad question\n  - Score: 0.30\n"));
        assert!(!prompts[0].contains("good question"));

        let report_path = run.report_path.unwrap();
        let file_name = report_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("evaluation_report_quick_"));
        assert_eq!(std::fs::read_to_string(&report_path).unwrap(), run.report_text);

        let augmented: Vec<Golden> = ArtifactStore::new(dir.path())
            .read_json("goldens_quick_with_output.json")
            .unwrap();
        assert_eq!(augmented[1].input, "bad question");
        assert_eq!(augmented[1].actual_output.as_deref(), Some("answer to bad question"));
        assert_eq!(augmented[1].retrieval_context, vec!["passage for bad question".to_string()]);
    }

    #[tokio::test]
    async fn test_rerun_reuses_cached_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&["good question", "bad question"]);
        let pipeline = fixture.pipeline(dir.path(), vec![Metric::Faithfulness]);

        pipeline.execute(EvalType::Deep).await.unwrap();
        let goldens_before = std::fs::read(dir.path().join("goldens_deep.json")).unwrap();
        let augmented_before =
            std::fs::read(dir.path().join("goldens_deep_with_output.json")).unwrap();

        pipeline.execute(EvalType::Deep).await.unwrap();

        assert_eq!(fixture.generator.call_count(), 1);
        assert_eq!(fixture.responder.call_count(), 2);
        assert_eq!(
            std::fs::read(dir.path().join("goldens_deep.json")).unwrap(),
            goldens_before
        );
        assert_eq!(
            std::fs::read(dir.path().join("goldens_deep_with_output.json")).unwrap(),
            augmented_before
        );
        // Scoring is repeated on every run
        assert_eq!(fixture.scorer.call_count(), 4);
    }

    #[tokio::test]
    async fn test_existing_goldens_skip_generation_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store
            .write_json("goldens_quick.json", &vec![Golden::new("good question")])
            .unwrap();
        let fixture = Fixture::new(&["never used"]);
        let pipeline = fixture.pipeline(dir.path(), vec![Metric::AnswerRelevancy]);

        let run = pipeline.execute(EvalType::Quick).await.unwrap();

        assert_eq!(fixture.generator.call_count(), 0);
        assert_eq!(fixture.responder.call_count(), 1);
        assert_eq!(run.summaries[0].1.rating, Rating::Good);
        assert!(run.report_text.ends_with("No specific failures found to summarize. Great job!"));
        assert!(fixture.llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_generation_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&[]);
        let pipeline = fixture.pipeline(dir.path(), vec![Metric::AnswerRelevancy]);

        let err = pipeline.execute(EvalType::Quick).await.unwrap_err();

        assert!(matches!(err, PipelineError::NoGoldens));
        assert!(!dir.path().join("goldens_quick.json").exists());
    }

    #[tokio::test]
    async fn test_rag_failure_aborts_before_scoring() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new(&["good question", "bad question"]);
        fixture.responder = Arc::new(EchoResponder::failing_on("bad question"));
        let pipeline = fixture.pipeline(dir.path(), vec![Metric::AnswerRelevancy]);

        let err = pipeline.execute(EvalType::Quick).await.unwrap_err();

        assert!(matches!(err, PipelineError::Rag { index: 1, .. }));
        assert!(err.to_string().contains("HTTP 503"));
        assert!(dir.path().join("goldens_quick.json").exists());
        assert!(!dir.path().join("goldens_quick_with_output.json").exists());
        assert_eq!(fixture.scorer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_crashed_metric_does_not_summarize_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&["good question", "bad question"]);
        fixture
            .pipeline(dir.path(), vec![Metric::Faithfulness])
            .execute(EvalType::Quick)
            .await
            .unwrap();
        assert_eq!(fixture.llm.prompts.lock().len(), 1);

        let llm = Arc::new(RecordingLLM::new("should not be asked"));
        let mut settings = Settings::default();
        settings.evaluation.artifact_dir = dir.path().to_path_buf();
        settings.evaluation.metrics = vec![Metric::Faithfulness];
        let rerun = Pipeline::new(
            settings,
            fixture.generator.clone(),
            fixture.responder.clone(),
            Arc::new(PanickingScorer),
            llm.clone(),
        );

        let run = rerun.execute(EvalType::Quick).await.unwrap();

        assert!(run
            .report_text
            .contains("faithfulness              | Score: Error | [Error]"));
        assert!(run.report_text.ends_with(NO_FAILURES_MESSAGE));
        assert!(llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_errored_metric_still_reported() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&["good question"]);
        let mut settings = Settings::default();
        settings.evaluation.artifact_dir = dir.path().to_path_buf();
        settings.evaluation.metrics = vec![Metric::AnswerRelevancy, Metric::Faithfulness];
        settings.evaluation.backend = ragscope_core::BackendConfig::Subprocess {
            program: PathBuf::from("/nonexistent/ragscope-worker"),
        };
        let pipeline = Pipeline::new(
            settings,
            fixture.generator.clone(),
            fixture.responder.clone(),
            fixture.scorer.clone(),
            fixture.llm.clone(),
        );

        let run = pipeline.execute(EvalType::Quick).await.unwrap();

        assert!(run
            .summaries
            .iter()
            .all(|(_, summary)| summary.rating == Rating::Error));
        assert!(run
            .report_text
            .contains("faithfulness              | Score: Error | [Error]"));
    }
}
