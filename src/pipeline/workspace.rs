use crate::api::ExecutionError;
use crate::manifest::{RuntimeManifest, MANIFEST_FILE_NAME};
use crate::results::FASTQ_DIR;
use crate::upload::ValidatedFastq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

pub const WORKDIR_PREFIX: &str = "msianalyzer_";

/// The private directory one run writes its inputs to and the toolchain
/// writes its outputs to. Removed on drop unless it was created to be kept.
#[derive(Debug)]
pub struct RunWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
    id: String,
}

impl RunWorkspace {
    pub fn create(work_root: Option<&Path>, keep: bool) -> Result<Self, ExecutionError> {
        let mut builder = Builder::new();
        builder.prefix(WORKDIR_PREFIX);
        let dir = match work_root {
            Some(root) => {
                fs::create_dir_all(root)
                    .map_err(|e| ExecutionError::workspace(format!("creating {}", root.display()), e))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| ExecutionError::workspace("creating the run directory", e))?;

        let path = dir
            .path()
            .canonicalize()
            .map_err(|e| ExecutionError::workspace("resolving the run directory", e))?;
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let dir = if keep {
            let kept = dir.into_path();
            debug!(path = %kept.display(), "run directory will be kept");
            None
        } else {
            Some(dir)
        };

        Ok(Self { dir, path, id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_kept(&self) -> bool {
        self.dir.is_none()
    }

    pub fn fastq_dir(&self) -> PathBuf {
        self.path.join(FASTQ_DIR)
    }

    /// Writes every upload to `fastq/<file name>` and returns the absolute paths.
    pub fn write_fastqs(&self, files: &[ValidatedFastq]) -> Result<Vec<PathBuf>, ExecutionError> {
        let fastq_dir = self.fastq_dir();
        fs::create_dir_all(&fastq_dir)
            .map_err(|e| ExecutionError::workspace("creating the FASTQ directory", e))?;

        files
            .iter()
            .map(|file| {
                let path = fastq_dir.join(file.file_name());
                fs::write(&path, &file.upload.bytes)
                    .map_err(|e| ExecutionError::workspace(format!("writing {}", file.file_name()), e))?;
                Ok(path)
            })
            .collect()
    }

    pub fn write_manifest(&self, manifest: &RuntimeManifest) -> Result<PathBuf, ExecutionError> {
        let path = self.path.join(MANIFEST_FILE_NAME);
        let json = manifest.to_json().map_err(|e| {
            ExecutionError::workspace("serializing the runtime manifest", std::io::Error::other(e))
        })?;
        fs::write(&path, json).map_err(|e| ExecutionError::workspace("writing the runtime manifest", e))?;
        Ok(path)
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %path.display(), "failed to remove run directory: {e}");
            }
        }
    }
}
