use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_SIMILARITY: f64 = 0.85;
pub const DEFAULT_ANCHOR_UNITS: u32 = 3;
pub const DEFAULT_THREADS: u32 = 4;

/// Flanking anchors and repeat unit of one microsatellite marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerDefinition {
    pub name: String,
    pub seq1: String,
    pub seq2: String,
    pub motif: String,
}

/// One uploaded sequencing file, held in memory until it is written to a run directory.
#[derive(Clone)]
pub struct FastqUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FastqUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

impl std::fmt::Debug for FastqUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastqUpload")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub min_similarity: f64,
    pub anchor_units: u32,
    pub threads: u32,
    pub run_tests: bool,
    pub skip_variant_summary: bool,
    /// `stub = SampleName` lines overriding the sample names inferred from file names
    pub group_map_text: String,
    /// File name of an uploaded FASTQ to draw a pileup plot for
    pub pileup_fastq: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            anchor_units: DEFAULT_ANCHOR_UNITS,
            threads: DEFAULT_THREADS,
            run_tests: false,
            skip_variant_summary: false,
            group_map_text: String::new(),
            pileup_fastq: None,
        }
    }
}

/// Everything a user submits for one analysis, before validation.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub marker: Option<String>,
    /// Raw bytes of an uploaded marker configuration (JSON)
    pub marker_config: Option<Vec<u8>>,
    pub fastq_files: Vec<FastqUpload>,
    pub options: AnalysisOptions,
}
