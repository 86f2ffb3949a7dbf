use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Path or name (looked up on PATH) of the MSIanalyzer executable
    #[serde(default = "default_msianalyzer")]
    pub msianalyzer: PathBuf,
    /// Directory holding per-marker reference FASTA files for pileups
    #[serde(default = "default_reference_dir")]
    pub reference_dir: PathBuf,
    /// Parent of the per-run directories; the system temp dir when unset
    #[serde(default)]
    pub work_root: Option<PathBuf>,
    #[serde(default)]
    pub keep_workdirs: bool,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_pileup_timeout_secs")]
    pub pileup_timeout_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    #[serde(default = "default_max_retained_runs")]
    pub max_retained_runs: usize,
    #[serde(default)]
    pub log_json: bool,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8501".to_string()
}

fn default_msianalyzer() -> PathBuf {
    PathBuf::from("msianalyzer")
}

fn default_reference_dir() -> PathBuf {
    PathBuf::from("hg38")
}

fn default_run_timeout_secs() -> u64 {
    3600
}

fn default_pileup_timeout_secs() -> u64 {
    1800
}

fn default_max_upload_bytes() -> usize {
    1024 * 1024 * 1024
}

fn default_max_concurrent_runs() -> usize {
    1
}

fn default_max_retained_runs() -> usize {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            msianalyzer: default_msianalyzer(),
            reference_dir: default_reference_dir(),
            work_root: None,
            keep_workdirs: false,
            run_timeout_secs: default_run_timeout_secs(),
            pileup_timeout_secs: default_pileup_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            max_concurrent_runs: default_max_concurrent_runs(),
            max_retained_runs: default_max_retained_runs(),
            log_json: false,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "msianalyzer", "msianalyzer-web")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Location of the per-user config file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reads the per-user config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                if let Ok(content) = fs::read_to_string(&config_path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                }
            }
        }
        Config::default()
    }

    /// Reads an explicitly named config file; errors are not swallowed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Explicit file if given, otherwise the per-user file, then `MSIWEB_*` overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::load(),
        };
        Ok(config.with_env_overrides(|name| env::var(name).ok()))
    }

    /// Applies `MSIWEB_*` overrides read through `lookup`. Unparseable values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("MSIWEB_BIND") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("MSIWEB_TOOL") {
            self.msianalyzer = PathBuf::from(v);
        }
        if let Some(v) = lookup("MSIWEB_REFERENCE_DIR") {
            self.reference_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MSIWEB_WORK_ROOT") {
            self.work_root = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MSIWEB_KEEP_WORKDIRS").as_deref().and_then(parse_bool) {
            self.keep_workdirs = v;
        }
        if let Some(v) = lookup("MSIWEB_RUN_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.run_timeout_secs = v;
        }
        if let Some(v) = lookup("MSIWEB_PILEUP_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.pileup_timeout_secs = v;
        }
        if let Some(v) = lookup("MSIWEB_MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
            self.max_upload_bytes = v;
        }
        if let Some(v) = lookup("MSIWEB_MAX_CONCURRENT_RUNS").and_then(|v| v.parse().ok()) {
            self.max_concurrent_runs = v;
        }
        if let Some(v) = lookup("MSIWEB_MAX_RETAINED_RUNS").and_then(|v| v.parse().ok()) {
            self.max_retained_runs = v;
        }
        if let Some(v) = lookup("MSIWEB_LOG_JSON").as_deref().and_then(parse_bool) {
            self.log_json = v;
        }
        self
    }

    /// Writes this config to the per-user location and returns the path.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::default_path().context("Failed to determine project directories")?;
        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir)
                .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: Config = toml::from_str("msianalyzer = \"/opt/msi/bin/msianalyzer\"\nrun_timeout_secs = 60\n").unwrap();
        assert_eq!(config.msianalyzer, PathBuf::from("/opt/msi/bin/msianalyzer"));
        assert_eq!(config.run_timeout_secs, 60);
        assert_eq!(config.pileup_timeout_secs, 1800);
        assert_eq!(config.max_concurrent_runs, 1);
        assert_eq!(config.bind_addr, "127.0.0.1:8501");
    }

    #[test]
    fn env_overrides_win_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MSIWEB_BIND", "0.0.0.0:9000"),
            ("MSIWEB_KEEP_WORKDIRS", "yes"),
            ("MSIWEB_MAX_RETAINED_RUNS", "not-a-number"),
            ("MSIWEB_WORK_ROOT", "/scratch/msi"),
        ]);
        let config = Config::default().with_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert!(config.keep_workdirs);
        assert_eq!(config.max_retained_runs, 8);
        assert_eq!(config.work_root, Some(PathBuf::from("/scratch/msi")));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config {
            work_root: Some(PathBuf::from("/tmp/runs")),
            ..Config::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }

    #[test]
    fn explicit_path_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "run_timeout_secs = \"soon\"").unwrap();
        let err = Config::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
        assert!(Config::from_path(&dir.path().join("missing.toml")).is_err());
    }
}
