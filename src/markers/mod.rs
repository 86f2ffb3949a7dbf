//! Bethesda panel markers and uploaded marker configurations.

use crate::api::ValidationError;
use crate::types::MarkerDefinition;
use serde::Deserialize;
use std::collections::HashMap;

struct BuiltinMarker {
    name: &'static str,
    seq1: &'static str,
    seq2: &'static str,
    motif: &'static str,
}

const BUILTIN_MARKERS: &[BuiltinMarker] = &[
    BuiltinMarker {
        name: "BAT25",
        seq1: "TCGCCTCCAAGAATGTAA",
        seq2: "ACTATGGCTCTAAAATGCTCTGT",
        motif: "T",
    },
    BuiltinMarker {
        name: "BAT26",
        seq1: "TGACTACTTTTGACTTCAGCC",
        seq2: "AACCATTCAACATTTTTAACC",
        motif: "A",
    },
    BuiltinMarker {
        name: "D2S123",
        seq1: "AAACAGGATGCCTGCCTTTA",
        seq2: "GGACTTTCCACCTATGGGAC",
        motif: "AC",
    },
    BuiltinMarker {
        name: "D5S346",
        seq1: "ACTCACTCTAGTGATAAATCGGG",
        seq2: "AGCAGATAAGACAGTATTACTAGTT",
        motif: "CA",
    },
    BuiltinMarker {
        name: "D17S250",
        seq1: "GGAAGAATCAAATAGACAAT",
        seq2: "GCTGGCCATATATATATTTAAACC",
        motif: "AC",
    },
];

impl BuiltinMarker {
    fn definition(&self) -> MarkerDefinition {
        MarkerDefinition {
            name: self.name.to_string(),
            seq1: self.seq1.to_string(),
            seq2: self.seq2.to_string(),
            motif: self.motif.to_string(),
        }
    }
}

/// All built-in markers, in panel order.
pub fn catalog() -> Vec<MarkerDefinition> {
    BUILTIN_MARKERS.iter().map(BuiltinMarker::definition).collect()
}

fn lookup_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Finds a built-in marker, ignoring case, `-` and `_` (`bat-26` is `BAT26`).
pub fn lookup(name: &str) -> Option<MarkerDefinition> {
    let key = lookup_key(name.trim());
    BUILTIN_MARKERS
        .iter()
        .find(|m| lookup_key(m.name) == key)
        .map(BuiltinMarker::definition)
}

/// Checks that a marker name is safe to pass as a command-line argument and
/// to match against reference file names.
pub fn validate_marker_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingMarkerName);
    }
    let allowed = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !allowed || name.starts_with('-') || name.starts_with('.') {
        return Err(ValidationError::InvalidMarkerName(name.to_string()));
    }
    Ok(name)
}

#[derive(Deserialize)]
struct MarkerFields {
    seq1: String,
    seq2: String,
    motif: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MarkerConfigFile {
    Manifest { markers: HashMap<String, MarkerFields> },
    Single(MarkerFields),
}

/// Parses an uploaded marker configuration for `name`.
///
/// Accepts either a bare `{"seq1", "seq2", "motif"}` object or a manifest-style
/// `{"markers": {"<name>": {...}}}` document containing the named marker.
pub fn parse_marker_config(name: &str, bytes: &[u8]) -> Result<MarkerDefinition, ValidationError> {
    let parsed: MarkerConfigFile = serde_json::from_slice(bytes)
        .map_err(|e| ValidationError::InvalidMarkerConfig(e.to_string()))?;

    let fields = match parsed {
        MarkerConfigFile::Single(fields) => fields,
        MarkerConfigFile::Manifest { mut markers } => {
            let key = markers
                .keys()
                .find(|k| lookup_key(k) == lookup_key(name))
                .cloned()
                .ok_or_else(|| {
                    ValidationError::InvalidMarkerConfig(format!(
                        "marker '{name}' is not defined in the uploaded config"
                    ))
                })?;
            markers.remove(&key).ok_or_else(|| {
                ValidationError::InvalidMarkerConfig(format!("marker '{name}' vanished"))
            })?
        }
    };

    let definition = MarkerDefinition {
        name: name.to_string(),
        seq1: normalize_sequence("seq1", &fields.seq1, b"ACGTNRYSWKMBDHV")?,
        seq2: normalize_sequence("seq2", &fields.seq2, b"ACGTNRYSWKMBDHV")?,
        motif: normalize_sequence("motif", &fields.motif, b"ACGT")?,
    };
    Ok(definition)
}

fn normalize_sequence(field: &str, value: &str, alphabet: &[u8]) -> Result<String, ValidationError> {
    let seq = value.trim().to_ascii_uppercase();
    if seq.is_empty() {
        return Err(ValidationError::InvalidMarkerConfig(format!("{field} is empty")));
    }
    if let Some(bad) = seq.bytes().find(|b| !alphabet.contains(b)) {
        return Err(ValidationError::InvalidMarkerConfig(format!(
            "{field} contains invalid nucleotide '{}'",
            bad as char
        )));
    }
    Ok(seq)
}

/// Resolves the marker for a submission: an uploaded config wins, otherwise the
/// name must be a built-in marker.
pub fn resolve(name: Option<&str>, config: Option<&[u8]>) -> Result<MarkerDefinition, ValidationError> {
    let name = validate_marker_name(name.unwrap_or_default())?;
    match config {
        Some(bytes) => parse_marker_config(name, bytes),
        None => lookup(name).ok_or_else(|| ValidationError::MissingMarkerConfig(name.to_string())),
    }
}
