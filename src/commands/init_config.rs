use crate::config::Config;
use anyhow::{bail, Context, Result};

pub fn run() -> Result<()> {
    let path = Config::default_path().context("Failed to determine project directories")?;
    if path.exists() {
        bail!("Config file already exists at {}", path.display());
    }
    let written = Config::default().save()?;
    println!("Wrote default configuration to {}", written.display());
    Ok(())
}
