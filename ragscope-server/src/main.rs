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

use anyhow::Result;
use clap::Parser;
use ragscope_server::{
    config::{worker_config_path, ServerConfig},
    run_server,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config file)
    #[arg(long, env = "RAGSCOPE_HTTP_ADDR")]
    http_addr: Option<String>,

    /// Artifact directory (overrides config file)
    #[arg(long, env = "RAGSCOPE_ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "RAGSCOPE_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ServerConfig::load(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(addr) = args.http_addr {
        config.server.listen_addr = addr;
    }
    if let Some(artifact_dir) = args.artifact_dir {
        config.settings.evaluation.artifact_dir = artifact_dir;
    }
    if args.log_json {
        config.server.log_json = true;
    }

    let config_path = worker_config_path(args.config.as_deref());
    run_server(config, config_path).await
}
