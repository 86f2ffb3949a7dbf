use super::error::ApiError;
use super::form::read_analysis_form;
use super::page;
use super::summary::RunSummary;
use super::AppState;
use crate::api::PresentationError;
use crate::markers;
use crate::results::content_type;
use crate::upload;
use crate::utils::external_tools::check_msianalyzer;
use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

/// Browsers submitting the upload form get pages, everything else gets JSON.
fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn respond(status: StatusCode, summary: RunSummary, html: bool) -> Response {
    if html {
        (status, Html(page::render_run(&summary))).into_response()
    } else {
        (status, Json(summary)).into_response()
    }
}

fn respond_error(err: ApiError, html: bool) -> Response {
    if html {
        (err.status, Html(page::render_error(&err))).into_response()
    } else {
        err.into_response()
    }
}

pub(crate) async fn landing() -> Html<String> {
    Html(page::render_form())
}

pub(crate) async fn healthz() -> &'static str {
    "ok"
}

pub(crate) async fn readyz(State(state): State<AppState>) -> Response {
    let program = state.config.msianalyzer.clone();
    match tokio::task::spawn_blocking(move || check_msianalyzer(&program)).await {
        Ok(Ok(version)) => Json(json!({ "status": "ready", "msianalyzer": version })).into_response(),
        Ok(Err(e)) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "tool_missing",
            format!("{e:#}"),
            Value::Null,
        )
        .into_response(),
        Err(e) => ApiError::internal(e.to_string()).into_response(),
    }
}

pub(crate) async fn list_markers() -> Json<Value> {
    Json(json!({ "markers": markers::catalog() }))
}

pub(crate) async fn create_analysis(State(state): State<AppState>, headers: HeaderMap, multipart: Multipart) -> Response {
    let html = wants_html(&headers);
    match run_analysis(&state, multipart).await {
        Ok(summary) => respond(StatusCode::CREATED, summary, html),
        Err(err) => {
            warn!(code = %err.code, "analysis rejected: {}", err.message);
            respond_error(err, html)
        }
    }
}

async fn run_analysis(state: &AppState, multipart: Multipart) -> Result<RunSummary, ApiError> {
    let request = read_analysis_form(multipart).await?;
    let validated = tokio::task::spawn_blocking(move || upload::validate(request))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    let _permit = state
        .run_slots
        .acquire()
        .await
        .map_err(|_| ApiError::internal("server is shutting down"))?;
    let run = state.pipeline.run(validated).await?;
    let summary = RunSummary::from_run(&run);
    state.runs.insert(run).await;
    Ok(summary)
}

pub(crate) async fn get_run(State(state): State<AppState>, Path(run_id): Path<String>, headers: HeaderMap) -> Response {
    let html = wants_html(&headers);
    match state.runs.summary(&run_id).await {
        Ok(summary) => respond(StatusCode::OK, summary, html),
        Err(err) => respond_error(err, html),
    }
}

fn attachment(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c.is_control() { '_' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

pub(crate) async fn download(
    State(state): State<AppState>,
    Path((run_id, relpath)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (artifact, path) = state.runs.locate(&run_id, &relpath).await?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PresentationError::Vanished {
            relpath: artifact.relpath.clone(),
        },
        _ => PresentationError::Io(e),
    })?;
    let len = file.metadata().await.map_err(PresentationError::Io)?.len();

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type(&artifact.name)));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(header::CONTENT_DISPOSITION, attachment(&artifact.name));
    if let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", artifact.sha256)) {
        headers.insert(header::ETAG, etag);
    }
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct PileupForm {
    fastq: String,
}

pub(crate) async fn pileup(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    headers: HeaderMap,
    form: Result<Form<PileupForm>, FormRejection>,
) -> Response {
    let html = wants_html(&headers);
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return respond_error(rejection.into(), html),
    };
    match run_pileup(&state, &run_id, &form.fastq).await {
        Ok(summary) => respond(StatusCode::OK, summary, html),
        Err(err) => respond_error(err, html),
    }
}

async fn run_pileup(state: &AppState, run_id: &str, fastq: &str) -> Result<RunSummary, ApiError> {
    let target = state.runs.pileup_target(run_id, fastq).await?;
    let _permit = state
        .run_slots
        .acquire()
        .await
        .map_err(|_| ApiError::internal("server is shutting down"))?;
    let (log, outputs) = state
        .pipeline
        .pileup_in(&target.run_dir, &target.marker, &target.fastq)
        .await?;
    info!(run = %run_id, fastq = %fastq, "pileup added to run");
    state.runs.apply_pileup(run_id, log, outputs).await
}

pub(crate) async fn delete_run(State(state): State<AppState>, Path(run_id): Path<String>) -> Result<StatusCode, ApiError> {
    state.runs.remove(&run_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Form-friendly variant of DELETE for the results page.
pub(crate) async fn clear_run(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    match state.runs.remove(&run_id).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => respond_error(err, true),
    }
}
