use super::error::ApiError;
use super::summary::RunSummary;
use crate::api::ValidationError;
use crate::pipeline::{AnalysisRun, StepLog};
use crate::results::{Artifact, OutputSet};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

/// Everything needed to run a pileup for a retained run without holding the registry lock.
pub(crate) struct PileupTarget {
    pub run_dir: PathBuf,
    pub marker: String,
    pub fastq: PathBuf,
}

/// Successful runs kept around so their files stay downloadable, oldest first.
pub struct RunRegistry {
    runs: Mutex<VecDeque<AnalysisRun>>,
    capacity: usize,
}

impl RunRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            runs: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Stores a run, evicting (and deleting) the oldest ones beyond capacity.
    pub async fn insert(&self, run: AnalysisRun) {
        let evicted: Vec<AnalysisRun> = {
            let mut runs = self.runs.lock().await;
            runs.push_back(run);
            let excess = runs.len().saturating_sub(self.capacity);
            runs.drain(..excess).collect()
        };
        for run in &evicted {
            info!(run = %run.id(), "evicting retained run");
        }
        drop(evicted);
    }

    pub async fn summary(&self, run_id: &str) -> Result<RunSummary, ApiError> {
        let runs = self.runs.lock().await;
        find(&runs, run_id).map(RunSummary::from_run)
    }

    pub async fn locate(&self, run_id: &str, relpath: &str) -> Result<(Artifact, PathBuf), ApiError> {
        let runs = self.runs.lock().await;
        let run = find(&runs, run_id)?;
        let (artifact, path) = run.outputs.locate(relpath)?;
        Ok((artifact.clone(), path))
    }

    pub(crate) async fn pileup_target(&self, run_id: &str, fastq_name: &str) -> Result<PileupTarget, ApiError> {
        let runs = self.runs.lock().await;
        let run = find(&runs, run_id)?;
        let fastq = run
            .fastq_path(fastq_name.trim())
            .ok_or_else(|| ValidationError::UnknownPileupFastq(fastq_name.to_string()))?;
        Ok(PileupTarget {
            run_dir: run.path().to_path_buf(),
            marker: run.marker.name.clone(),
            fastq: fastq.to_path_buf(),
        })
    }

    pub(crate) async fn apply_pileup(&self, run_id: &str, log: StepLog, outputs: OutputSet) -> Result<RunSummary, ApiError> {
        let mut runs = self.runs.lock().await;
        let run = runs
            .iter_mut()
            .find(|run| run.id() == run_id)
            .ok_or_else(|| ApiError::run_not_found(run_id))?;
        run.outputs = outputs;
        run.steps.push(log);
        Ok(RunSummary::from_run(run))
    }

    /// Removes a run and deletes its directory.
    pub async fn remove(&self, run_id: &str) -> Result<(), ApiError> {
        let removed = {
            let mut runs = self.runs.lock().await;
            let index = runs
                .iter()
                .position(|run| run.id() == run_id)
                .ok_or_else(|| ApiError::run_not_found(run_id))?;
            runs.remove(index)
        };
        info!(run = %run_id, "run cleared");
        drop(removed);
        Ok(())
    }
}

fn find<'a>(runs: &'a VecDeque<AnalysisRun>, run_id: &str) -> Result<&'a AnalysisRun, ApiError> {
    runs.iter()
        .find(|run| run.id() == run_id)
        .ok_or_else(|| ApiError::run_not_found(run_id))
}
