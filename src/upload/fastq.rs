use bio::io::fastq::{self, FastqRead};
use niffler::get_reader;
use std::io::BufReader;

/// What a quick pass over an uploaded FASTQ found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastqSummary {
    pub reads: u64,
    pub compressed: bool,
}

/// Decompresses (gzip and friends, via niffler) and parses every record,
/// rejecting empty files and records whose sequence and quality disagree.
pub fn inspect(bytes: &[u8]) -> Result<FastqSummary, String> {
    if bytes.is_empty() {
        return Err("file is empty".to_string());
    }

    let (inner_reader, compression) =
        get_reader(Box::new(bytes)).map_err(|e| format!("cannot decompress: {e}"))?;
    let mut reader = fastq::Reader::new(BufReader::with_capacity(64 * 1024, inner_reader));

    let mut record = fastq::Record::new();
    let mut reads = 0u64;
    loop {
        reader
            .read(&mut record)
            .map_err(|e| format!("record {}: {e}", reads + 1))?;
        if record.is_empty() {
            break;
        }
        record
            .check()
            .map_err(|e| format!("record {} ({}): {e}", reads + 1, record.id()))?;
        reads += 1;
    }

    if reads == 0 {
        return Err("no FASTQ records found".to_string());
    }

    Ok(FastqSummary {
        reads,
        compressed: compression != niffler::compression::Format::No,
    })
}
