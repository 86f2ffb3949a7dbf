//! Upload validation: nothing reaches the pipeline unless it passes through here.

pub mod fastq;

use crate::api::ValidationError;
use crate::manifest::strip_fastq_extension;
use crate::markers;
use crate::types::{AnalysisOptions, AnalysisRequest, FastqUpload, MarkerDefinition};
use std::collections::HashSet;
use tracing::debug;

pub use fastq::FastqSummary;

/// A FASTQ upload that passed name and content checks.
#[derive(Debug, Clone)]
pub struct ValidatedFastq {
    pub upload: FastqUpload,
    pub summary: FastqSummary,
}

impl ValidatedFastq {
    pub fn file_name(&self) -> &str {
        &self.upload.file_name
    }
}

/// A submission that is safe to hand to the pipeline.
#[derive(Debug, Clone)]
pub struct ValidatedAnalysis {
    pub marker: MarkerDefinition,
    pub fastq_files: Vec<ValidatedFastq>,
    pub options: AnalysisOptions,
}

/// Reduces a client-supplied file name to its base name and checks the extension.
pub fn sanitize_fastq_name(raw: &str) -> Result<String, ValidationError> {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let stem_ok = strip_fastq_extension(base).is_some_and(|stem| !stem.is_empty());
    if !stem_ok || base.starts_with('.') {
        return Err(ValidationError::InvalidFastqName(raw.to_string()));
    }
    Ok(base.to_string())
}

/// Range checks for the numeric options.
pub fn validate_options(options: &AnalysisOptions) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&options.min_similarity) {
        return Err(ValidationError::option("min_similarity", "must be between 0.0 and 1.0"));
    }
    if !(1..=20).contains(&options.anchor_units) {
        return Err(ValidationError::option("anchor_units", "must be between 1 and 20"));
    }
    if !(1..=32).contains(&options.threads) {
        return Err(ValidationError::option("threads", "must be between 1 and 32"));
    }
    Ok(())
}

/// Checks presence and basic shape of a submission.
///
/// The marker is resolved first, then every FASTQ is parsed once; the first
/// problem found is returned.
pub fn validate(request: AnalysisRequest) -> Result<ValidatedAnalysis, ValidationError> {
    let AnalysisRequest {
        marker,
        marker_config,
        fastq_files,
        mut options,
    } = request;

    let marker = markers::resolve(marker.as_deref(), marker_config.as_deref())?;

    if fastq_files.is_empty() {
        return Err(ValidationError::NoFastqFiles);
    }
    validate_options(&options)?;

    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(fastq_files.len());
    for upload in fastq_files {
        let file_name = sanitize_fastq_name(&upload.file_name)?;
        if !seen.insert(file_name.clone()) {
            return Err(ValidationError::DuplicateFastq(file_name));
        }
        let summary = fastq::inspect(&upload.bytes).map_err(|reason| ValidationError::MalformedFastq {
            name: file_name.clone(),
            reason,
        })?;
        debug!(file = %file_name, reads = summary.reads, compressed = summary.compressed, "FASTQ accepted");
        validated.push(ValidatedFastq {
            upload: FastqUpload {
                file_name,
                bytes: upload.bytes,
            },
            summary,
        });
    }

    // The pipeline matches the pileup target against stored names, so it is
    // kept in the same sanitized form.
    if let Some(pileup) = options.pileup_fastq.take() {
        let pileup_name =
            sanitize_fastq_name(&pileup).map_err(|_| ValidationError::UnknownPileupFastq(pileup.clone()))?;
        if !seen.contains(&pileup_name) {
            return Err(ValidationError::UnknownPileupFastq(pileup));
        }
        options.pileup_fastq = Some(pileup_name);
    }

    Ok(ValidatedAnalysis {
        marker,
        fastq_files: validated,
        options,
    })
}
