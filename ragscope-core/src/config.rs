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

//! Evaluation configuration shared by the server and the CLI
//!
//! Loaded from the `[evaluation]`, `[models]` and `[rag]` tables of a TOML
//! file, then overridden by environment variables. Every field has a default
//! so an empty file (or no file) yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    ConfigError, EvalType, Metric, SynthesisParams, Thresholds, DEFAULT_IMPROVEMENT_THRESHOLD,
    DEFAULT_PASS_THRESHOLD,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvaluationConfig {
    /// Directory holding goldens, metric reports and final reports
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Document the golden generator synthesizes questions from
    #[serde(default = "default_source_document")]
    pub source_document: PathBuf,

    /// Metrics to score, in report order
    #[serde(default = "default_metrics")]
    pub metrics: Vec<Metric>,

    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,

    #[serde(default = "default_improvement_threshold")]
    pub improvement_threshold: f64,

    /// Where metric runners execute
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub profiles: ProfileConfig,
}

/// Execution backend for the per-metric fan-out
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// One async task per metric inside this process
    #[default]
    InProcess,
    /// One worker process per metric, running `<program> score-metric ...`
    Subprocess { program: PathBuf },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    #[serde(default = "default_quick_profile")]
    pub quick: EvalProfile,
    #[serde(default = "default_deep_profile")]
    pub deep: EvalProfile,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            quick: default_quick_profile(),
            deep: default_deep_profile(),
        }
    }
}

/// Files and synthesis parameters bound to one eval type
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvalProfile {
    pub goldens_file: String,
    pub goldens_with_output_file: String,
    pub max_goldens_per_context: usize,
    pub num_evolutions: usize,
}

impl EvalProfile {
    pub fn synthesis(&self) -> SynthesisParams {
        SynthesisParams {
            max_goldens_per_context: self.max_goldens_per_context,
            num_evolutions: self.num_evolutions,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Ollama base URL (e.g., "http://localhost:11434")
    #[serde(default = "default_ollama_base_url")]
    pub ollama_base_url: String,

    /// Model used for golden synthesis, judging and summarization
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Embedding model for context de-duplication; unset disables it
    #[serde(default)]
    pub embedding_model: Option<String>,

    #[serde(default = "default_model_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: default_ollama_base_url(),
            generation_model: default_generation_model(),
            embedding_model: None,
            request_timeout_secs: default_model_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RagConfig {
    /// Endpoint of the RAG agent under test
    #[serde(default = "default_rag_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_rag_timeout")]
    pub timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rag_endpoint(),
            api_key: None,
            timeout_secs: default_rag_timeout(),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            source_document: default_source_document(),
            metrics: default_metrics(),
            pass_threshold: default_pass_threshold(),
            improvement_threshold: default_improvement_threshold(),
            backend: BackendConfig::default(),
            profiles: ProfileConfig::default(),
        }
    }
}

impl EvaluationConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.pass_threshold, self.improvement_threshold)
    }

    pub fn profile(&self, eval_type: EvalType) -> &EvalProfile {
        match eval_type {
            EvalType::Quick => &self.profiles.quick,
            EvalType::Deep => &self.profiles.deep,
        }
    }
}

// Default values
fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./ragscope-data")
}

fn default_source_document() -> PathBuf {
    PathBuf::from("./source.txt")
}

fn default_metrics() -> Vec<Metric> {
    Metric::ALL.to_vec()
}

fn default_pass_threshold() -> f64 {
    DEFAULT_PASS_THRESHOLD
}

fn default_improvement_threshold() -> f64 {
    DEFAULT_IMPROVEMENT_THRESHOLD
}

fn default_quick_profile() -> EvalProfile {
    EvalProfile {
        goldens_file: "goldens_quick.json".to_string(),
        goldens_with_output_file: "goldens_quick_with_output.json".to_string(),
        max_goldens_per_context: 1,
        num_evolutions: 3,
    }
}

fn default_deep_profile() -> EvalProfile {
    EvalProfile {
        goldens_file: "goldens_deep.json".to_string(),
        goldens_with_output_file: "goldens_deep_with_output.json".to_string(),
        max_goldens_per_context: 3,
        num_evolutions: 5,
    }
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_generation_model() -> String {
    "llama3.2".to_string()
}

fn default_model_timeout() -> u64 {
    300
}

fn default_rag_endpoint() -> String {
    "http://localhost:8000/invoke".to_string()
}

fn default_rag_timeout() -> u64 {
    120
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(path)?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Override fields from environment variables
    ///
    /// Supported variables:
    /// - RAGSCOPE_ARTIFACT_DIR: artifact directory
    /// - RAGSCOPE_SOURCE_DOCUMENT: source document for golden synthesis
    /// - RAGSCOPE_RAG_ENDPOINT: RAG agent endpoint
    /// - RAGSCOPE_RAG_API_KEY: bearer token for the RAG agent
    /// - RAGSCOPE_GENERATION_MODEL: generation/judge model
    /// - RAGSCOPE_EMBEDDING_MODEL: embedding model
    /// - OLLAMA_BASE_URL: Ollama base URL
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("RAGSCOPE_ARTIFACT_DIR") {
            self.evaluation.artifact_dir = PathBuf::from(dir);
        }
        if let Some(doc) = lookup("RAGSCOPE_SOURCE_DOCUMENT") {
            self.evaluation.source_document = PathBuf::from(doc);
        }
        if let Some(endpoint) = lookup("RAGSCOPE_RAG_ENDPOINT") {
            self.rag.endpoint = endpoint;
        }
        if let Some(key) = lookup("RAGSCOPE_RAG_API_KEY") {
            self.rag.api_key = Some(key);
        }
        if let Some(model) = lookup("RAGSCOPE_GENERATION_MODEL") {
            self.models.generation_model = model;
        }
        if let Some(model) = lookup("RAGSCOPE_EMBEDDING_MODEL") {
            self.models.embedding_model = Some(model).filter(|m| !m.is_empty());
        }
        if let Some(base_url) = lookup("OLLAMA_BASE_URL") {
            self.models.ollama_base_url = base_url;
        }
    }

    /// Validate configuration and create the artifact directory
    pub fn validate(&self) -> Result<(), ConfigError> {
        let eval = &self.evaluation;

        if eval.metrics.is_empty() {
            return Err(ConfigError::Invalid("no metrics configured".to_string()));
        }
        for (i, metric) in eval.metrics.iter().enumerate() {
            if eval.metrics[..i].contains(metric) {
                return Err(ConfigError::Invalid(format!(
                    "metric '{}' listed more than once",
                    metric
                )));
            }
        }

        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(eval.pass_threshold) || !in_unit(eval.improvement_threshold) {
            return Err(ConfigError::Invalid(
                "thresholds must lie within [0, 1]".to_string(),
            ));
        }
        if eval.improvement_threshold > eval.pass_threshold {
            return Err(ConfigError::Invalid(format!(
                "improvement threshold {} exceeds pass threshold {}",
                eval.improvement_threshold, eval.pass_threshold
            )));
        }

        let mut file_names = Vec::new();
        for eval_type in EvalType::ALL {
            let profile = eval.profile(eval_type);
            for name in [&profile.goldens_file, &profile.goldens_with_output_file] {
                if name.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "empty golden file name in the {} profile",
                        eval_type
                    )));
                }
                if file_names.contains(&name) {
                    return Err(ConfigError::Invalid(format!(
                        "golden file '{}' is shared between profiles",
                        name
                    )));
                }
                file_names.push(name);
            }
        }

        if let BackendConfig::Subprocess { program } = &eval.backend {
            if program.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "subprocess backend requires a worker program".to_string(),
                ));
            }
        }

        if !eval.artifact_dir.exists() {
            std::fs::create_dir_all(&eval.artifact_dir).map_err(|source| ConfigError::Read {
                path: eval.artifact_dir.clone(),
                source,
            })?;
        }

        Ok(())
    }
}
