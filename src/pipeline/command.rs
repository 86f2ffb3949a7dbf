use crate::types::AnalysisOptions;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// The two `msianalyzer` subcommands this front-end drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RunMarker,
    Pileup,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::RunMarker => "run-marker",
            Step::Pileup => "pileup",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub step: Step,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl ToolCommand {
    /// `msianalyzer run-marker <marker> <manifest> [--run-tests] [--skip-variant-summary] [--threads N]`
    pub fn run_marker(program: &Path, marker: &str, manifest: &Path, options: &AnalysisOptions, cwd: &Path) -> Self {
        let mut args: Vec<OsString> = vec![
            Step::RunMarker.as_str().into(),
            marker.into(),
            manifest.as_os_str().to_owned(),
        ];
        if options.run_tests {
            args.push("--run-tests".into());
        }
        if options.skip_variant_summary {
            args.push("--skip-variant-summary".into());
        }
        if options.threads > 1 {
            args.push("--threads".into());
            args.push(options.threads.to_string().into());
        }

        Self {
            step: Step::RunMarker,
            program: program.to_path_buf(),
            args,
            cwd: cwd.to_path_buf(),
        }
    }

    /// `msianalyzer pileup <fastq> <reference>`
    pub fn pileup(program: &Path, fastq: &Path, reference: &Path, cwd: &Path) -> Self {
        Self {
            step: Step::Pileup,
            program: program.to_path_buf(),
            args: vec![
                Step::Pileup.as_str().into(),
                fastq.as_os_str().to_owned(),
                reference.as_os_str().to_owned(),
            ],
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
