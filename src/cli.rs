use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web front-end (upload form, analysis API and downloads)
    Serve {
        /// Config file to use instead of the per-user one
        #[arg(long)]
        config: Option<PathBuf>,
        /// Address to listen on, e.g. 0.0.0.0:8501
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run one analysis from the terminal and copy the results to a directory
    Run {
        /// Marker name (built-in, or described by --marker-config)
        #[arg(long)]
        marker: String,
        /// JSON file with seq1/seq2/motif for the marker
        #[arg(long)]
        marker_config: Option<PathBuf>,
        /// Minimum flank similarity (default: 0.85)
        #[arg(long, default_value_t = crate::types::DEFAULT_MIN_SIMILARITY)]
        min_similarity: f64,
        /// Repeat units anchoring each flank (default: 3)
        #[arg(long, default_value_t = crate::types::DEFAULT_ANCHOR_UNITS)]
        anchor_units: u32,
        /// Worker threads passed to msianalyzer (default: 4)
        #[arg(long, default_value_t = crate::types::DEFAULT_THREADS)]
        threads: u32,
        #[arg(long)]
        run_tests: bool,
        #[arg(long)]
        skip_variant_summary: bool,
        /// File with one "stub = SampleName" line per sample
        #[arg(long)]
        group_map: Option<PathBuf>,
        /// File name of one of the FASTQ inputs to draw a pileup for
        #[arg(long)]
        pileup: Option<String>,
        /// Where to copy the outputs (default: msianalyzer_results/<run id>)
        #[arg(short = 'o', long = "output-dir")]
        output_dir: Option<PathBuf>,
        /// Config file to use instead of the per-user one
        #[arg(long)]
        config: Option<PathBuf>,
        /// FASTQ files (.fastq, .fq, optionally gzipped)
        #[arg(required = true)]
        fastq: Vec<PathBuf>,
    },

    /// List the built-in markers
    Markers,

    /// Check that msianalyzer and the reference directory are usable
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write the default config file to the user config directory
    InitConfig,
}
