#![allow(dead_code)]

use msianalyzer_web::Config;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

/// Stand-in for the real toolchain. Behaviour is picked from the FASTQ names
/// that end up in the manifest: `fail_*` exits 3, `slow_*` sleeps past any
/// test timeout and `big_*` pads the report past a megabyte. A pileup of
/// `vanish_*` deletes the summary report and a pileup of `broken_*` exits 4.
/// `pileup` also fails when its reference path does not resolve from the run
/// directory. Every invocation is appended to `<work root>/calls.log`.
const FAKE_MSIANALYZER: &str = r#"#!/bin/sh
case "$1" in
  --version)
    echo "msianalyzer 0.0.0-fake"
    ;;
  run-marker)
    echo "$*" >> ../calls.log
    manifest=$(cat "$3")
    case "$manifest" in
      *fail_*) echo "Traceback (most recent call last): boom" >&2; exit 3 ;;
      *slow_*) exec sleep 30 ;;
    esac
    mkdir -p "$2"
    printf 'sample\tmsi_status\nS1\tstable\n' > "$2/$2_summary.tsv"
    case "$manifest" in
      *big_*) seq 1 200000 >> "$2/$2_summary.tsv" ;;
    esac
    echo "analyzed $2"
    ;;
  pileup)
    echo "$*" >> ../calls.log
    [ -f "$3" ] || { echo "reference not found: $3" >&2; exit 1; }
    case "$2" in
      *vanish_*) rm -f ./*/*_summary.tsv ;;
      *broken_*) echo "pileup crashed on $2" >&2; exit 4 ;;
    esac
    name=$(basename "$2")
    printf '<svg xmlns="http://www.w3.org/2000/svg"/>\n' > "pileup_${name%%.*}.svg"
    ;;
  *)
    echo "unknown command $1" >&2
    exit 2
    ;;
esac
"#;

static TOOL: OnceLock<(TempDir, PathBuf)> = OnceLock::new();

/// Path of the fake executable, written once per test binary so no test
/// spawns processes while it is still open for writing.
pub fn fake_tool() -> PathBuf {
    TOOL.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("msianalyzer");
        fs::write(&path, FAKE_MSIANALYZER).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    })
    .1
    .clone()
}

/// Scratch space for one test: run directories plus a reference FASTA dir.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("runs")).unwrap();
        fs::create_dir_all(dir.path().join("hg38")).unwrap();
        fs::write(dir.path().join("hg38/BAT26_hg38.fa"), ">BAT26\nACGT\n").unwrap();
        Self { dir }
    }

    pub fn work_root(&self) -> PathBuf {
        self.dir.path().join("runs")
    }

    pub fn config(&self) -> Config {
        Config {
            msianalyzer: fake_tool(),
            reference_dir: self.dir.path().join("hg38"),
            work_root: Some(self.work_root()),
            ..Config::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.work_root().join("calls.log"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Run directories currently on disk.
    pub fn run_dirs(&self) -> Vec<PathBuf> {
        list_run_dirs(&self.work_root())
    }
}

pub fn list_run_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|p| p.canonicalize().ok())
        .collect();
    dirs.sort();
    dirs
}

pub fn fastq_reads(n: usize) -> Vec<u8> {
    (0..n)
        .map(|i| format!("@read{i}\nTGACTACTTTTGACTTCAGCCAAAAAAAAAAAAAAAAAAAAAAAAAAGGTTAAAAATGTTGAATGGTT\n+\n{}\n", "I".repeat(68)))
        .collect::<String>()
        .into_bytes()
}
