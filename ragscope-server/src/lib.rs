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

//! Ragscope HTTP Server
//!
//! Exposes the evaluation pipeline as background tasks:
//!
//! - `POST /api/run-evaluation/:eval_type` starts a run and returns its task id
//! - `GET /api/status/:task_id` reports the task's status and, once
//!   finished, its report or error
//! - `GET /health` liveness probe

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use ragscope_evals::{EvaluationExecutor, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod task_registry;

use api::AppState;
use config::ServerConfig;
use task_registry::TaskRegistry;

pub const DEFAULT_LOG_FILTER: &str = "ragscope_server=info,ragscope_evals=info,tower_http=info";

/// Install the global tracing subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the application router around a task registry
pub fn build_router(registry: TaskRegistry, enable_cors: bool) -> Router {
    let state = AppState { registry };

    let api_routes = Router::new()
        .route(
            "/api/run-evaluation/:eval_type",
            post(api::evaluation::run_evaluation),
        )
        .route("/api/status/:task_id", get(api::evaluation::get_status));

    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .merge(api_routes)
        .with_state(state);

    let app = if enable_cors {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig, config_path: Option<PathBuf>) -> Result<()> {
    init_tracing(config.server.log_json);

    tracing::info!("Starting Ragscope Server");
    tracing::debug!("Configuration: {:#?}", config);

    config.validate()?;
    let addr = config.socket_addr()?;

    let pipeline = Pipeline::from_settings(&config.settings, config_path)?;
    let executor: Arc<dyn EvaluationExecutor> = Arc::new(pipeline);
    let registry = TaskRegistry::new(
        executor,
        config.server.max_tasks,
        config.task_retention(),
    );

    let app = build_router(registry, config.server.enable_cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
