pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod manifest;
pub mod markers;
pub mod pipeline;
pub mod results;
pub mod server;
pub mod types;
pub mod upload;
pub mod utils;

// Re-export main API
pub use api::*;
pub use config::Config;
pub use pipeline::{AnalysisRun, Pipeline, PipelineSettings};
pub use results::{Artifact, ArtifactKind, OutputSet};
pub use types::{AnalysisOptions, AnalysisRequest, FastqUpload, MarkerDefinition};
