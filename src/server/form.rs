use super::error::ApiError;
use crate::api::ValidationError;
use crate::types::{AnalysisRequest, FastqUpload};
use axum::extract::Multipart;
use std::str::FromStr;
use tracing::warn;

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Checkbox semantics: an absent field is false, a present one carries `on`, `true`, `1` or `yes`.
pub(crate) fn parse_checkbox(field: &str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        other => Err(ValidationError::option(field, format!("'{other}' is not a checkbox value"))),
    }
}

/// Blank numeric fields keep the default.
pub(crate) fn parse_number<T: FromStr>(field: &str, value: &str, current: T) -> Result<T, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(current);
    }
    value
        .parse()
        .map_err(|_| ValidationError::option(field, format!("'{value}' is not a number")))
}

/// Reads the analysis form. Browsers send an empty `fastq` part when no file
/// was picked; those are dropped here so validation sees "no FASTQ files".
pub(crate) async fn read_analysis_form(mut multipart: Multipart) -> Result<AnalysisRequest, ApiError> {
    let mut request = AnalysisRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "marker_config" => {
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    request.marker_config = Some(bytes.to_vec());
                }
            }
            "fastq" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                request.fastq_files.push(FastqUpload::new(file_name, bytes.to_vec()));
            }
            "marker" => request.marker = non_empty(field.text().await?),
            "min_similarity" => {
                let text = field.text().await?;
                request.options.min_similarity = parse_number(&name, &text, request.options.min_similarity)?;
            }
            "anchor_units" => {
                let text = field.text().await?;
                request.options.anchor_units = parse_number(&name, &text, request.options.anchor_units)?;
            }
            "threads" => {
                let text = field.text().await?;
                request.options.threads = parse_number(&name, &text, request.options.threads)?;
            }
            "run_tests" => request.options.run_tests = parse_checkbox(&name, &field.text().await?)?,
            "skip_variant_summary" => {
                request.options.skip_variant_summary = parse_checkbox(&name, &field.text().await?)?
            }
            "group_map" => request.options.group_map_text = field.text().await?,
            "pileup_fastq" => request.options.pileup_fastq = non_empty(field.text().await?),
            other => warn!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkboxes() {
        assert!(parse_checkbox("run_tests", "on").unwrap());
        assert!(parse_checkbox("run_tests", "").unwrap());
        assert!(!parse_checkbox("run_tests", "False").unwrap());
        assert!(parse_checkbox("run_tests", "maybe").is_err());
    }

    #[test]
    fn numbers_keep_default_when_blank() {
        assert_eq!(parse_number("threads", " ", 4u32).unwrap(), 4);
        assert_eq!(parse_number("threads", "8", 4u32).unwrap(), 8);
        assert_eq!(parse_number("min_similarity", "0.9", 0.85f64).unwrap(), 0.9);
        let err = parse_number("anchor_units", "three", 3u32).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidOption { field, .. } if field == "anchor_units"));
    }
}
