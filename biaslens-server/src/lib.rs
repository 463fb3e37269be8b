// Copyright 2026 BiasLens Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Evaluation orchestrator and HTTP surface for the bias-evaluation
//! pipeline, following `agentreplay-server::lib::run_server`'s bootstrap
//! shape: tracing init, config validation, authenticator selection, router
//! assembly, serve.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod state;

use std::sync::Arc;

use anyhow::Result;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use auth::{auth_middleware, Authenticator, BearerTokenAuth, NoAuth};
use biaslens_core::store::memory::InMemoryStore;
use config::ServerConfig;
use state::AppState;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biaslens_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting biaslens-server");
    config.validate()?;

    let authenticator: Arc<dyn Authenticator> = if config.auth.enabled {
        Arc::new(BearerTokenAuth::new(config.auth.bearer_tokens.clone()))
    } else {
        tracing::warn!("authentication is disabled (NoAuth mode) — do not run this way in production");
        Arc::new(NoAuth::new("dev-team"))
    };

    let store = Arc::new(InMemoryStore::new());
    let addr = config.socket_addr()?;
    let state = AppState::new(store, config.clone());

    let authed_routes = Router::new()
        .route("/evaluate", post(api::create_evaluation))
        .route("/evaluate/:id", get(api::get_evaluation))
        .route("/evaluations/:id/progress", get(api::get_progress))
        .route("/verify-repro-pack", post(api::verify_repro_pack_handler))
        .layer(axum_middleware::from_fn(auth_middleware))
        .layer(Extension(authenticator));

    let cors = if config.server.enable_cors {
        let mut cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        cors = if config.server.cors_origins.is_empty() {
            tracing::warn!("CORS: allowing all origins (development mode)");
            cors.allow_origin(Any)
        } else {
            cors.allow_origin(Any)
        };
        cors
    } else {
        CorsLayer::new()
    };

    let app = Router::new()
        .route("/healthz", get(api::health_check))
        .merge(authed_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
