use crate::api::{AnalysisError, ExecutionError};
use crate::config::Config;
use crate::pipeline::{Pipeline, PipelineSettings};
use crate::types::{AnalysisOptions, AnalysisRequest, FastqUpload};
use crate::upload;
use crate::utils::progress_bar_builder::{spinner_callback, ProgressBarBuilder};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct RunOptions {
    pub marker: String,
    pub marker_config: Option<PathBuf>,
    pub min_similarity: f64,
    pub anchor_units: u32,
    pub threads: u32,
    pub run_tests: bool,
    pub skip_variant_summary: bool,
    pub group_map: Option<PathBuf>,
    pub pileup: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub fastq: Vec<PathBuf>,
}

fn read_upload(path: &Path) -> Result<FastqUpload> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read FASTQ file {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(FastqUpload::new(name, bytes))
}

fn build_request(opts: &RunOptions) -> Result<AnalysisRequest> {
    let marker_config = match &opts.marker_config {
        Some(path) => Some(fs::read(path).with_context(|| format!("Failed to read marker config {}", path.display()))?),
        None => None,
    };
    let group_map_text = match &opts.group_map {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read group map {}", path.display()))?,
        None => String::new(),
    };
    let fastq_files = opts.fastq.iter().map(|p| read_upload(p)).collect::<Result<Vec<_>>>()?;

    Ok(AnalysisRequest {
        marker: Some(opts.marker.clone()),
        marker_config,
        fastq_files,
        options: AnalysisOptions {
            min_similarity: opts.min_similarity,
            anchor_units: opts.anchor_units,
            threads: opts.threads,
            run_tests: opts.run_tests,
            skip_variant_summary: opts.skip_variant_summary,
            group_map_text,
            pileup_fastq: opts.pileup.clone(),
        },
    })
}

pub async fn run(opts: RunOptions) -> Result<()> {
    let config = Config::resolve(opts.config.as_deref())?;
    let validated = upload::validate(build_request(&opts)?)?;

    let pb = ProgressBarBuilder::new(format!("Analyzing {}...", validated.marker.name))
        .with_tick(Duration::from_millis(100))
        .build()?;
    let pipeline = Pipeline::new(PipelineSettings::from(&config)).with_progress(spinner_callback(pb.clone()));

    let run = match pipeline.run(validated).await {
        Ok(run) => run,
        Err(e) => {
            pb.finish_and_clear();
            if let AnalysisError::Execution(ExecutionError::NonZeroExit { stdout, stderr, .. }) = &e {
                eprint!("{stdout}{stderr}");
            }
            return Err(e.into());
        }
    };
    pb.finish_with_message(format!("{} finished ({} output files)", run.marker.name, run.outputs.len()));

    for step in &run.steps {
        if !step.stdout.trim().is_empty() {
            println!("--- msianalyzer {} ---\n{}", step.step, step.stdout.trim_end());
        }
    }

    let output_dir = opts
        .output_dir
        .unwrap_or_else(|| PathBuf::from("msianalyzer_results").join(run.id()));
    run.outputs
        .copy_to(&output_dir)
        .with_context(|| format!("Failed to copy results to {}", output_dir.display()))?;

    println!("Results written to {}", output_dir.display());
    for artifact in run.outputs.artifacts() {
        println!("  {:<9} {:>10}  {}", artifact.kind.as_str(), artifact.size, artifact.relpath);
    }
    Ok(())
}
