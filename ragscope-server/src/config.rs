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

use anyhow::{Context, Result};
use ragscope_core::Settings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ragscope Server Configuration
///
/// The `[server]` table configures the HTTP surface; every other table is the
/// evaluation [`Settings`] shared with the CLI.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(flatten)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:47200")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Number of tasks kept for status polling; only finished tasks are evicted
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// How long a task stays queryable after it finishes
    #[serde(default = "default_task_retention")]
    pub task_retention_secs: u64,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            enable_cors: default_enable_cors(),
            max_tasks: default_max_tasks(),
            task_retention_secs: default_task_retention(),
            log_json: false,
        }
    }
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:47200".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_max_tasks() -> usize {
    1000
}

fn default_task_retention() -> u64 {
    86400 // 24 hours
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
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

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from environment variables
    ///
    /// Server variables:
    /// - RAGSCOPE_HTTP_ADDR: HTTP listen address
    /// - RAGSCOPE_ENABLE_CORS: enable CORS
    /// - RAGSCOPE_MAX_TASKS: task store capacity
    /// - RAGSCOPE_TASK_RETENTION_SECS: how long finished tasks stay queryable
    /// - RAGSCOPE_LOG_JSON: JSON log output
    ///
    /// Evaluation variables are handled by [`Settings::apply_env`].
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("RAGSCOPE_HTTP_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(cors) = lookup("RAGSCOPE_ENABLE_CORS") {
            self.server.enable_cors = cors.parse().unwrap_or(true);
        }
        if let Some(max_tasks) = lookup("RAGSCOPE_MAX_TASKS") {
            if let Ok(val) = max_tasks.parse() {
                self.server.max_tasks = val;
            }
        }
        if let Some(retention) = lookup("RAGSCOPE_TASK_RETENTION_SECS") {
            if let Ok(val) = retention.parse() {
                self.server.task_retention_secs = val;
            }
        }
        if let Some(json) = lookup("RAGSCOPE_LOG_JSON") {
            self.server.log_json = json.parse().unwrap_or(false);
        }

        self.settings.apply_env(lookup);
    }

    /// Get socket address for HTTP server
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address '{}'", self.server.listen_addr))
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.server.task_retention_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.server.max_tasks == 0 {
            anyhow::bail!("max_tasks must be at least 1");
        }
        if self.server.task_retention_secs == 0 {
            anyhow::bail!("task_retention_secs must be at least 1");
        }

        self.settings.validate()?;
        Ok(())
    }
}

/// Resolve the config path the subprocess workers should receive
pub fn worker_config_path(config_file: Option<&Path>) -> Option<PathBuf> {
    config_file.filter(|p| p.exists()).map(Path::to_path_buf)
}
