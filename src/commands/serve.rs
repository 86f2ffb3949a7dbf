use crate::config::Config;
use crate::server;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

pub async fn run(config_path: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let mut config = Config::resolve(config_path.as_deref())?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }

    info!(
        msianalyzer = %config.msianalyzer.display(),
        reference_dir = %config.reference_dir.display(),
        max_concurrent_runs = config.max_concurrent_runs,
        "starting msianalyzer-web"
    );
    if let Err(e) = crate::utils::external_tools::check_msianalyzer(&config.msianalyzer) {
        warn!("{e:#}; analyses will fail until it is installed");
    }

    server::serve(config).await
}
