use crate::config::Config;
use crate::utils::external_tools::{check_msianalyzer, check_reference_dir};
use anyhow::Result;
use std::path::PathBuf;

/// Reports both checks before failing so one run shows everything that is missing.
pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::resolve(config_path.as_deref())?;

    let tool = check_msianalyzer(&config.msianalyzer);
    match &tool {
        Ok(version) => println!("msianalyzer: {} ({})", config.msianalyzer.display(), version),
        Err(e) => println!("msianalyzer: MISSING - {e:#}"),
    }

    let references = check_reference_dir(&config.reference_dir);
    match &references {
        Ok(files) => println!(
            "reference dir: {} ({} FASTA: {})",
            config.reference_dir.display(),
            files.len(),
            files.join(", ")
        ),
        Err(e) => println!("reference dir: MISSING - {e:#}"),
    }

    tool?;
    references?;
    Ok(())
}
