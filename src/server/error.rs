use crate::api::{AnalysisError, ExecutionError, PresentationError, ValidationError};
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Error body shared by every endpoint: `{"error": {"code", "message", "details"}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>, details: Value) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            details,
        }
    }

    pub fn run_not_found(run_id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "run_not_found",
            format!("no retained run '{run_id}'; it may have been cleared or evicted"),
            json!({ "run_id": run_id }),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message, Value::Null)
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let (status, details) = match &err {
            AnalysisError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::to_value(e).unwrap_or(Value::Null),
            ),
            AnalysisError::Execution(e) => match e {
                ExecutionError::ToolMissing { program } => {
                    (StatusCode::SERVICE_UNAVAILABLE, json!({ "program": program }))
                }
                ExecutionError::ReferenceMissing(_) => (StatusCode::SERVICE_UNAVAILABLE, Value::Null),
                ExecutionError::TimedOut { step, seconds } => (
                    StatusCode::GATEWAY_TIMEOUT,
                    json!({ "step": step, "seconds": seconds }),
                ),
                ExecutionError::NonZeroExit {
                    step,
                    code,
                    stdout,
                    stderr,
                } => (
                    StatusCode::BAD_GATEWAY,
                    json!({ "step": step, "exit_code": code, "stdout": stdout, "stderr": stderr }),
                ),
                ExecutionError::NoOutputs { step } => (StatusCode::BAD_GATEWAY, json!({ "step": step })),
                ExecutionError::Spawn { program, .. } => {
                    (StatusCode::BAD_GATEWAY, json!({ "program": program }))
                }
                ExecutionError::Workspace { .. } => (StatusCode::INTERNAL_SERVER_ERROR, Value::Null),
            },
            AnalysisError::Presentation(e) => match e {
                PresentationError::NotFound { relpath } => {
                    (StatusCode::NOT_FOUND, json!({ "relpath": relpath }))
                }
                PresentationError::MissingOutput { kind } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, json!({ "kind": kind }))
                }
                PresentationError::Vanished { relpath } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, json!({ "relpath": relpath }))
                }
                PresentationError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, Value::Null),
            },
        };
        Self::new(status, code, message, details)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        AnalysisError::from(err).into()
    }
}

impl From<ExecutionError> for ApiError {
    fn from(err: ExecutionError) -> Self {
        AnalysisError::from(err).into()
    }
}

impl From<PresentationError> for ApiError {
    fn from(err: PresentationError) -> Self {
        AnalysisError::from(err).into()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "invalid_multipart"
        };
        Self::new(status, code, err.body_text(), Value::Null)
    }
}

impl From<FormRejection> for ApiError {
    fn from(err: FormRejection) -> Self {
        Self::new(err.status(), "invalid_form", err.body_text(), Value::Null)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(json!({ "error": self }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ArtifactKind;

    #[test]
    fn statuses_follow_error_stage() {
        let e: ApiError = ValidationError::NoFastqFiles.into();
        assert_eq!(e.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(e.details["kind"], "no_fastq_files");

        let e: ApiError = ExecutionError::ToolMissing {
            program: "msianalyzer".into(),
        }
        .into();
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(e.code, "tool_missing");

        let e: ApiError = ExecutionError::NonZeroExit {
            step: "run-marker".into(),
            code: Some(3),
            stdout: String::new(),
            stderr: "boom".into(),
        }
        .into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
        assert_eq!(e.details["exit_code"], 3);
        assert_eq!(e.details["stderr"], "boom");

        let e: ApiError = PresentationError::MissingOutput {
            kind: ArtifactKind::Report,
        }
        .into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.details["kind"], "report");

        let e: ApiError = PresentationError::NotFound { relpath: "x".into() }.into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);
    }
}
