use crate::pipeline::{AnalysisRun, FastqInfo, StepLog};
use crate::results::Artifact;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactView {
    #[serde(flatten)]
    pub artifact: Artifact,
    pub download_url: String,
}

/// What the client gets back for a run: inputs, executed steps and downloadable files.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub marker: String,
    pub created_at: String,
    pub fastq_files: Vec<FastqInfo>,
    pub steps: Vec<StepLog>,
    pub artifacts: Vec<ArtifactView>,
}

impl RunSummary {
    pub fn from_run(run: &AnalysisRun) -> Self {
        let run_id = run.id().to_string();
        let artifacts = run
            .outputs
            .artifacts()
            .iter()
            .map(|artifact| ArtifactView {
                download_url: download_url(&run_id, &artifact.relpath),
                artifact: artifact.clone(),
            })
            .collect();

        Self {
            marker: run.marker.name.clone(),
            created_at: run.created_at.to_rfc3339(),
            fastq_files: run.fastq_files.clone(),
            steps: run.steps.clone(),
            artifacts,
            run_id,
        }
    }
}

pub fn run_url(run_id: &str) -> String {
    format!("/v1/runs/{}", encode_segment(run_id))
}

pub fn download_url(run_id: &str, relpath: &str) -> String {
    let path = relpath
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/files/{path}", run_url(run_id))
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
