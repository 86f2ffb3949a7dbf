use crate::api::ExecutionError;
use std::fs;
use std::path::{Path, PathBuf};

const FASTA_EXTENSIONS: [&str; 2] = [".fa", ".fasta"];

/// Finds the reference FASTA for a marker: the first `.fa`/`.fasta` file in
/// `dir` (by name) whose file name contains the marker name, ignoring case.
///
/// The returned path is absolute: the tool runs with the run directory as its
/// working directory, so a relative `dir` would no longer resolve there.
pub fn find_reference(dir: &Path, marker: &str) -> Result<PathBuf, ExecutionError> {
    let dir = match dir.canonicalize() {
        Ok(dir) if dir.is_dir() => dir,
        _ => {
            return Err(ExecutionError::ReferenceMissing(format!(
                "reference directory not found: {}",
                dir.display()
            )))
        }
    };

    let entries = fs::read_dir(&dir).map_err(|e| {
        ExecutionError::ReferenceMissing(format!("cannot read {}: {e}", dir.display()))
    })?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    candidates.sort();

    let marker_lower = marker.to_ascii_lowercase();
    candidates
        .into_iter()
        .find(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            FASTA_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) && name.contains(&marker_lower)
        })
        .ok_or_else(|| {
            ExecutionError::ReferenceMissing(format!(
                "no reference FASTA for marker '{marker}' in {}",
                dir.display()
            ))
        })
}
