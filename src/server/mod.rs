//! HTTP front-end: upload form, analysis submission and artifact downloads.

mod error;
mod form;
mod handlers;
mod page;
mod registry;
mod summary;

pub use error::ApiError;
pub use registry::RunRegistry;
pub use summary::{download_url, run_url, ArtifactView, RunSummary};

use crate::config::Config;
use crate::pipeline::{Pipeline, PipelineSettings};
use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
    pub runs: Arc<RunRegistry>,
    pub run_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let pipeline = Pipeline::new(PipelineSettings::from(&config));
        Self {
            pipeline: Arc::new(pipeline),
            runs: Arc::new(RunRegistry::new(config.max_retained_runs)),
            run_slots: Arc::new(Semaphore::new(config.max_concurrent_runs.max(1))),
            config: Arc::new(config),
        }
    }
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let resp = next.run(req).await;
    info!(
        %method,
        %path,
        status = resp.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    resp
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::landing))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/v1/markers", get(handlers::list_markers))
        .route("/v1/analyses", post(handlers::create_analysis))
        .route("/v1/runs/:run_id", get(handlers::get_run).delete(handlers::delete_run))
        .route("/v1/runs/:run_id/files/*path", get(handlers::download))
        .route("/v1/runs/:run_id/pileup", post(handlers::pileup))
        .route("/v1/runs/:run_id/clear", post(handlers::clear_run))
        .layer(from_fn(log_requests))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("could not register signal handlers, falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Serves on an already bound listener until the process is signalled.
pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!("msianalyzer-web listening on http://{addr}");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("Server failed")?;
    info!("msianalyzer-web stopped");
    Ok(())
}

pub async fn serve(config: Config) -> Result<()> {
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    serve_on(listener, AppState::new(config)).await
}
