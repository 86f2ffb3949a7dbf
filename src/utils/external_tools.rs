use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::process::Command;

/// Runs `<program> --version` and returns the first line it printed.
pub fn check_msianalyzer(program: &Path) -> Result<String> {
    let output = Command::new(program)
        .arg("--version")
        .output()
        .with_context(|| {
            format!(
                "{} not found. Please install MSIanalyzer (https://github.com/NagelLabHub/MSIanalyzer) and ensure it's in your PATH",
                program.display()
            )
        })?;

    if !output.status.success() {
        bail!(
            "{} --version failed: {}",
            program.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let version = stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown version")
        .to_string();
    Ok(version)
}

/// Lists the reference FASTA files available for pileups.
pub fn check_reference_dir(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).with_context(|| {
        format!(
            "Reference directory not found: {}. Pileup plots need one FASTA per marker there",
            dir.display()
        )
    })?;

    let mut fastas: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| {
            let lower = name.to_ascii_lowercase();
            lower.ends_with(".fa") || lower.ends_with(".fasta")
        })
        .collect();
    fastas.sort();

    if fastas.is_empty() {
        bail!("No .fa/.fasta files in {}", dir.display());
    }
    Ok(fastas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_reported() {
        let err = check_msianalyzer(Path::new("/nonexistent/msianalyzer")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn reference_dir_lists_fastas() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_reference_dir(dir.path()).is_err());
        fs::write(dir.path().join("BAT26.fa"), ">x\nA\n").unwrap();
        fs::write(dir.path().join("BAT26.fa.fai"), "").unwrap();
        assert_eq!(check_reference_dir(dir.path()).unwrap(), ["BAT26.fa"]);
    }
}
