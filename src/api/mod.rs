use crate::results::ArtifactKind;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Progress callback for CLI spinners and server logs
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Progress events emitted while a run moves through its steps
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    Started { task: String },
    Message { task: String, message: String },
    Completed { task: String },
    Error { task: String, error: String },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Rejected submissions. Nothing has been written or launched when one of these is returned.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("a marker name is required")]
    MissingMarkerName,

    #[error("invalid marker name '{0}': use letters, digits, '_', '.' or '-'")]
    InvalidMarkerName(String),

    #[error("no configuration for marker '{0}': upload a marker config or choose a built-in marker")]
    MissingMarkerConfig(String),

    #[error("invalid marker config: {0}")]
    InvalidMarkerConfig(String),

    #[error("please upload at least one FASTQ file")]
    NoFastqFiles,

    #[error("'{0}' is not a FASTQ file name (expected .fastq, .fq, .fastq.gz or .fq.gz)")]
    InvalidFastqName(String),

    #[error("FASTQ file '{0}' was uploaded more than once")]
    DuplicateFastq(String),

    #[error("FASTQ file '{name}' is malformed: {reason}")]
    MalformedFastq { name: String, reason: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidOption { field: String, reason: String },

    #[error("pileup FASTQ '{0}' is not among the uploaded files")]
    UnknownPileupFastq(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingMarkerName => "missing_marker_name",
            ValidationError::InvalidMarkerName(_) => "invalid_marker_name",
            ValidationError::MissingMarkerConfig(_) => "missing_marker_config",
            ValidationError::InvalidMarkerConfig(_) => "invalid_marker_config",
            ValidationError::NoFastqFiles => "no_fastq_files",
            ValidationError::InvalidFastqName(_) => "invalid_fastq_name",
            ValidationError::DuplicateFastq(_) => "duplicate_fastq",
            ValidationError::MalformedFastq { .. } => "malformed_fastq",
            ValidationError::InvalidOption { .. } => "invalid_option",
            ValidationError::UnknownPileupFastq(_) => "unknown_pileup_fastq",
        }
    }

    pub(crate) fn option(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidOption {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures of the external toolchain or of the run directory around it.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to run `{program}`: executable not found; make sure MSIanalyzer is installed and in PATH")]
    ToolMissing { program: String },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`msianalyzer {step}` exited with {}", describe_exit(*code))]
    NonZeroExit {
        step: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("`msianalyzer {step}` timed out after {seconds}s")]
    TimedOut { step: String, seconds: u64 },

    #[error("`msianalyzer {step}` reported success but produced no output files")]
    NoOutputs { step: String },

    #[error("reference FASTA unavailable: {0}")]
    ReferenceMissing(String),

    #[error("run directory error while {context}: {source}")]
    Workspace {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl ExecutionError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::ToolMissing { .. } => "tool_missing",
            ExecutionError::Spawn { .. } => "spawn_failed",
            ExecutionError::NonZeroExit { .. } => "non_zero_exit",
            ExecutionError::TimedOut { .. } => "timed_out",
            ExecutionError::NoOutputs { .. } => "no_outputs",
            ExecutionError::ReferenceMissing(_) => "reference_missing",
            ExecutionError::Workspace { .. } => "workspace_error",
        }
    }

    pub(crate) fn workspace(context: impl Into<String>, source: std::io::Error) -> Self {
        ExecutionError::Workspace {
            context: context.into(),
            source,
        }
    }
}

/// Inconsistencies between what a successful run reported and what is on disk.
#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("the toolchain reported success but no {kind} file was produced")]
    MissingOutput { kind: ArtifactKind },

    #[error("output file '{relpath}' disappeared after the run finished")]
    Vanished { relpath: String },

    #[error("no output file named '{relpath}'")]
    NotFound { relpath: String },

    #[error("failed to read outputs: {0}")]
    Io(#[from] std::io::Error),
}

impl PresentationError {
    pub fn code(&self) -> &'static str {
        match self {
            PresentationError::MissingOutput { .. } => "missing_output",
            PresentationError::Vanished { .. } => "output_vanished",
            PresentationError::NotFound { .. } => "not_found",
            PresentationError::Io(_) => "output_io",
        }
    }
}

/// Any terminal failure of one analysis request.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Presentation(#[from] PresentationError),
}

impl AnalysisError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Validation(e) => e.code(),
            AnalysisError::Execution(e) => e.code(),
            AnalysisError::Presentation(e) => e.code(),
        }
    }
}
