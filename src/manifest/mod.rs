//! The runtime manifest handed to `msianalyzer run-marker`.

use crate::types::{AnalysisOptions, MarkerDefinition};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "manifest_runtime.json";

pub(crate) const FASTQ_EXTENSIONS: [&str; 4] = [".fastq.gz", ".fq.gz", ".fastq", ".fq"];

#[derive(Debug, Serialize)]
pub struct MarkerEntry {
    pub seq1: String,
    pub seq2: String,
    pub motif: String,
    pub group_map: BTreeMap<String, String>,
    pub fastq_files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct RuntimeManifest {
    pub markers: BTreeMap<String, MarkerEntry>,
    pub min_similarity: f64,
    pub anchor_units: u32,
    pub fastq_files: Vec<PathBuf>,
}

/// Strips a FASTQ extension, if present.
pub fn strip_fastq_extension(file_name: &str) -> Option<&str> {
    FASTQ_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
}

/// Sample stub of a FASTQ file: the base name without its extension and
/// without the last `_`-delimited token (`BVSBWG_3_500x.fastq.gz` -> `BVSBWG_3`).
pub fn infer_stub(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = strip_fastq_extension(&base).unwrap_or(&base);

    match base.rsplit_once('_') {
        Some((head, _)) => head.to_string(),
        None => base.to_string(),
    }
}

/// Parses `stub = SampleName` lines. Blank lines, `#` comments and lines
/// without a usable `=` pair are skipped.
pub fn parse_group_map(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(stub, name)| (stub.trim(), name.trim()))
        .filter(|(stub, name)| !stub.is_empty() && !name.is_empty())
        .map(|(stub, name)| (stub.to_string(), name.to_string()))
        .collect()
}

impl RuntimeManifest {
    pub fn build(marker: &MarkerDefinition, fastq_paths: &[PathBuf], options: &AnalysisOptions) -> Self {
        let user_map = parse_group_map(&options.group_map_text);

        let group_map = fastq_paths
            .iter()
            .map(|path| {
                let stub = infer_stub(path);
                let sample = user_map.get(&stub).cloned().unwrap_or_else(|| stub.clone());
                (stub, sample)
            })
            .collect();

        let entry = MarkerEntry {
            seq1: marker.seq1.clone(),
            seq2: marker.seq2.clone(),
            motif: marker.motif.clone(),
            group_map,
            fastq_files: fastq_paths.to_vec(),
        };

        RuntimeManifest {
            markers: BTreeMap::from([(marker.name.clone(), entry)]),
            min_similarity: options.min_similarity,
            anchor_units: options.anchor_units,
            fastq_files: fastq_paths.to_vec(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
