//! Output enumeration and download access for finished runs.

use crate::api::PresentationError;
use crate::manifest::MANIFEST_FILE_NAME;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Directory (relative to the run directory) holding the uploaded FASTQs.
pub const FASTQ_DIR: &str = "fastq";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Report,
    Plot,
    Alignment,
    Log,
    Other,
}

impl ArtifactKind {
    pub fn classify(file_name: &str) -> Self {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "tsv" | "csv" | "txt" | "html" | "json" | "xlsx" | "md" => ArtifactKind::Report,
            "png" | "jpg" | "jpeg" | "svg" | "pdf" => ArtifactKind::Plot,
            "bam" | "bai" | "sam" | "cram" | "crai" | "paf" => ArtifactKind::Alignment,
            "log" => ArtifactKind::Log,
            _ => ArtifactKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Report => "report",
            ArtifactKind::Plot => "plot",
            ArtifactKind::Alignment => "alignment",
            ArtifactKind::Log => "log",
            ArtifactKind::Other => "other",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MIME type used when serving a file for download.
pub fn content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "html" => "text/html; charset=utf-8",
        "json" => "application/json",
        "tsv" => "text/tab-separated-values",
        "csv" => "text/csv",
        "txt" | "log" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Path relative to the run directory, `/`-separated
    pub relpath: String,
    pub name: String,
    pub kind: ArtifactKind,
    pub size: u64,
    pub sha256: String,
}

/// The files a successful run produced, excluding the inputs written for it.
#[derive(Debug, Clone, Default)]
pub struct OutputSet {
    root: PathBuf,
    artifacts: Vec<Artifact>,
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn is_input(relpath: &str) -> bool {
    relpath == MANIFEST_FILE_NAME || relpath.starts_with(&format!("{FASTQ_DIR}/"))
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<Artifact>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(root, &path, out)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let relpath = path
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if is_input(&relpath) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        out.push(Artifact {
            kind: ArtifactKind::classify(&name),
            size: entry.metadata()?.len(),
            sha256: sha256_file(&path)?,
            relpath,
            name,
        });
    }
    Ok(())
}

impl OutputSet {
    /// Lists every output under `root` without checking for particular kinds.
    pub fn scan(root: &Path) -> Result<Self, PresentationError> {
        let mut artifacts = Vec::new();
        walk(root, root, &mut artifacts)?;
        artifacts.sort_by(|a, b| a.relpath.cmp(&b.relpath));
        Ok(Self {
            root: root.to_path_buf(),
            artifacts,
        })
    }

    /// Lists the outputs under `root` and fails if any `required` kind is absent.
    pub fn collect(root: &Path, required: &[ArtifactKind]) -> Result<Self, PresentationError> {
        let set = Self::scan(root)?;
        set.require(required)?;
        Ok(set)
    }

    pub fn require(&self, required: &[ArtifactKind]) -> Result<(), PresentationError> {
        let kinds = self.kinds();
        match required.iter().find(|kind| !kinds.contains(kind)) {
            Some(kind) => Err(PresentationError::MissingOutput { kind: *kind }),
            None => Ok(()),
        }
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn kinds(&self) -> BTreeSet<ArtifactKind> {
        self.artifacts.iter().map(|a| a.kind).collect()
    }

    pub fn get(&self, relpath: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.relpath == relpath)
    }

    /// On-disk location of a listed artifact. Unlisted paths (including any
    /// attempt at `..` traversal) are `NotFound`; listed paths missing from
    /// disk are `Vanished`.
    pub fn locate(&self, relpath: &str) -> Result<(&Artifact, PathBuf), PresentationError> {
        let safe = Path::new(relpath)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        let artifact = self
            .get(relpath)
            .filter(|_| safe)
            .ok_or_else(|| PresentationError::NotFound {
                relpath: relpath.to_string(),
            })?;

        let path = self.root.join(relpath);
        if !path.is_file() {
            return Err(PresentationError::Vanished {
                relpath: relpath.to_string(),
            });
        }
        Ok((artifact, path))
    }

    pub fn read(&self, relpath: &str) -> Result<(Artifact, Vec<u8>), PresentationError> {
        let (artifact, path) = self.locate(relpath)?;
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PresentationError::Vanished {
                relpath: relpath.to_string(),
            },
            _ => PresentationError::Io(e),
        })?;
        Ok((artifact.clone(), bytes))
    }

    /// Re-checks that every listed artifact is still on disk.
    pub fn verify(&self) -> Result<(), PresentationError> {
        for artifact in &self.artifacts {
            self.locate(&artifact.relpath)?;
        }
        Ok(())
    }

    /// Copies every artifact below `dest`, keeping relative paths.
    pub fn copy_to(&self, dest: &Path) -> Result<Vec<PathBuf>, PresentationError> {
        self.verify()?;
        let mut written = Vec::with_capacity(self.artifacts.len());
        for artifact in &self.artifacts {
            let target = dest.join(&artifact.relpath);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(self.root.join(&artifact.relpath), &target)?;
            written.push(target);
        }
        Ok(written)
    }
}
