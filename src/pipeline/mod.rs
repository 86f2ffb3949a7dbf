//! Runs the external MSIanalyzer toolchain for one validated submission.

pub mod command;
pub mod reference;
pub mod workspace;

use crate::api::{AnalysisResult, ExecutionError, PresentationError, ProgressCallback, ProgressEvent, ValidationError};
use crate::config::Config;
use crate::manifest::RuntimeManifest;
use crate::results::{ArtifactKind, OutputSet};
use crate::types::MarkerDefinition;
use crate::upload::ValidatedAnalysis;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{error, info};

pub use command::{Step, ToolCommand};
pub use reference::find_reference;
pub use workspace::RunWorkspace;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub program: PathBuf,
    pub reference_dir: PathBuf,
    pub work_root: Option<PathBuf>,
    pub keep_workdirs: bool,
    pub run_timeout: Duration,
    pub pileup_timeout: Duration,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            program: config.msianalyzer.clone(),
            reference_dir: config.reference_dir.clone(),
            work_root: config.work_root.clone(),
            keep_workdirs: config.keep_workdirs,
            run_timeout: Duration::from_secs(config.run_timeout_secs.max(1)),
            pileup_timeout: Duration::from_secs(config.pileup_timeout_secs.max(1)),
        }
    }
}

/// Captured result of one finished subprocess.
#[derive(Debug, Clone, Serialize)]
pub struct StepLog {
    pub step: String,
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FastqInfo {
    pub name: String,
    pub reads: u64,
    #[serde(skip)]
    pub path: PathBuf,
}

/// A successful run: its directory, what was executed and what it produced.
#[derive(Debug)]
pub struct AnalysisRun {
    pub marker: MarkerDefinition,
    pub created_at: DateTime<Utc>,
    pub fastq_files: Vec<FastqInfo>,
    pub steps: Vec<StepLog>,
    pub outputs: OutputSet,
    workspace: RunWorkspace,
}

impl AnalysisRun {
    pub fn id(&self) -> &str {
        self.workspace.id()
    }

    pub fn path(&self) -> &Path {
        self.workspace.path()
    }

    pub fn fastq_path(&self, name: &str) -> Option<&Path> {
        self.fastq_files
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.path.as_path())
    }

    /// Draws a pileup plot for one of this run's FASTQ files and refreshes the output list.
    pub async fn pileup(&mut self, pipeline: &Pipeline, fastq_name: &str) -> AnalysisResult<StepLog> {
        let fastq = self
            .fastq_path(fastq_name)
            .ok_or_else(|| ValidationError::UnknownPileupFastq(fastq_name.to_string()))?
            .to_path_buf();
        let (log, outputs) = pipeline
            .pileup_in(self.workspace.path(), &self.marker.name, &fastq)
            .await?;
        self.outputs = outputs;
        self.steps.push(log.clone());
        Ok(log)
    }
}

pub struct Pipeline {
    settings: PipelineSettings,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }

    /// Materializes the inputs, runs `run-marker` (and `pileup` when requested)
    /// and returns the presented outputs. Any failure drops the run directory,
    /// so a failed run never leaves downloadable files behind.
    pub async fn run(&self, analysis: ValidatedAnalysis) -> AnalysisResult<AnalysisRun> {
        let ValidatedAnalysis {
            marker,
            fastq_files,
            options,
        } = analysis;

        let workspace = RunWorkspace::create(self.settings.work_root.as_deref(), self.settings.keep_workdirs)?;
        let run_id = workspace.id().to_string();
        info!(run = %run_id, marker = %marker.name, files = fastq_files.len(), "starting analysis");

        let paths = workspace.write_fastqs(&fastq_files)?;
        let manifest = RuntimeManifest::build(&marker, &paths, &options);
        let manifest_path = workspace.write_manifest(&manifest)?;

        let fastq_infos: Vec<FastqInfo> = fastq_files
            .iter()
            .zip(&paths)
            .map(|(file, path)| FastqInfo {
                name: file.file_name().to_string(),
                reads: file.summary.reads,
                path: path.clone(),
            })
            .collect();

        let pileup_target = match &options.pileup_fastq {
            Some(pileup_name) => {
                let fastq = fastq_infos
                    .iter()
                    .find(|f| &f.name == pileup_name)
                    .ok_or_else(|| ValidationError::UnknownPileupFastq(pileup_name.clone()))?;
                let reference = find_reference(&self.settings.reference_dir, &marker.name)?;
                Some(ToolCommand::pileup(&self.settings.program, &fastq.path, &reference, workspace.path()))
            }
            None => None,
        };

        let run_marker = ToolCommand::run_marker(
            &self.settings.program,
            &marker.name,
            &manifest_path,
            &options,
            workspace.path(),
        );
        let mut steps = vec![self.execute(&run_id, &run_marker, self.settings.run_timeout).await?];

        let produced = scan_outputs(workspace.path(), Vec::new()).await?;
        if produced.is_empty() {
            return Err(ExecutionError::NoOutputs {
                step: Step::RunMarker.to_string(),
            }
            .into());
        }

        let mut required = vec![ArtifactKind::Report];
        if let Some(pileup) = pileup_target {
            steps.push(self.execute(&run_id, &pileup, self.settings.pileup_timeout).await?);
            required.push(ArtifactKind::Plot);
        }

        let outputs = scan_outputs(workspace.path(), required).await?;
        info!(run = %run_id, artifacts = outputs.len(), "analysis finished");

        Ok(AnalysisRun {
            marker,
            created_at: Utc::now(),
            fastq_files: fastq_infos,
            steps,
            outputs,
            workspace,
        })
    }

    /// Runs `pileup` inside an existing run directory and rescans its outputs.
    /// The caller keeps its previous output list if this fails.
    pub async fn pileup_in(&self, run_dir: &Path, marker: &str, fastq: &Path) -> AnalysisResult<(StepLog, OutputSet)> {
        let run_id = run_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !run_dir.is_dir() || !fastq.is_file() {
            return Err(ExecutionError::workspace(
                format!("locating {}", fastq.display()),
                std::io::Error::new(ErrorKind::NotFound, "run directory or FASTQ no longer on disk"),
            )
            .into());
        }

        let reference = find_reference(&self.settings.reference_dir, marker)?;
        let command = ToolCommand::pileup(&self.settings.program, fastq, &reference, run_dir);
        let log = self.execute(&run_id, &command, self.settings.pileup_timeout).await?;
        let outputs = scan_outputs(run_dir, vec![ArtifactKind::Report, ArtifactKind::Plot]).await?;
        Ok((log, outputs))
    }

    async fn execute(&self, run_id: &str, command: &ToolCommand, limit: Duration) -> Result<StepLog, ExecutionError> {
        let task = command.step.to_string();
        let rendered = command.to_string();
        info!(run = %run_id, command = %rendered, "running toolchain step");
        self.emit(ProgressEvent::Started { task: task.clone() });
        self.emit(ProgressEvent::Message {
            task: task.clone(),
            message: rendered.clone(),
        });

        let result = spawn_and_wait(command, limit).await;
        match &result {
            Ok(log) => {
                info!(run = %run_id, step = %task, elapsed_ms = log.elapsed_ms, "step finished");
                self.emit(ProgressEvent::Completed { task });
            }
            Err(e) => {
                error!(run = %run_id, step = %task, "step failed: {e}");
                self.emit(ProgressEvent::Error {
                    task,
                    error: e.to_string(),
                });
            }
        }
        result
    }
}

async fn spawn_and_wait(command: &ToolCommand, limit: Duration) -> Result<StepLog, ExecutionError> {
    let started = Instant::now();
    let child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(&command.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ExecutionError::ToolMissing {
                program: command.program_name(),
            },
            _ => ExecutionError::Spawn {
                program: command.program_name(),
                source: e,
            },
        })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(output) => output.map_err(|e| ExecutionError::Spawn {
            program: command.program_name(),
            source: e,
        })?,
        Err(_) => {
            return Err(ExecutionError::TimedOut {
                step: command.step.to_string(),
                seconds: limit.as_secs(),
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(ExecutionError::NonZeroExit {
            step: command.step.to_string(),
            code: output.status.code(),
            stdout,
            stderr,
        });
    }

    Ok(StepLog {
        step: command.step.to_string(),
        command: command.to_string(),
        exit_code: output.status.code(),
        stdout,
        stderr,
        elapsed_ms: started.elapsed().as_millis() as u64,
    })
}

async fn scan_outputs(root: &Path, required: Vec<ArtifactKind>) -> Result<OutputSet, PresentationError> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || OutputSet::collect(&root, &required))
        .await
        .map_err(|e| PresentationError::Io(std::io::Error::other(e)))?
}
