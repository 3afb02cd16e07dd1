//! Corpus manifest loading and typed filtering.
//!
//! The manifest is a tab-separated file with a header row. Columns are
//! addressed by name, so extra columns are tolerated; `src`, `duration`,
//! `data_type`, and the vocabulary's transcript column are required.

use crate::error::{DataError, Result};
use crate::vocab::VocabType;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Corpus partition tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Partition {
    Train,
    Dev,
    Test,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Dev => "dev",
            Partition::Test => "test",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = DataError;

    fn from_str(s: &str) -> std::result::Result<Self, DataError> {
        match s {
            "train" => Ok(Partition::Train),
            "dev" => Ok(Partition::Dev),
            "test" => Ok(Partition::Test),
            other => Err(DataError::UnknownPartition(other.to_string())),
        }
    }
}

/// One labeled corpus record, immutable once loaded.
#[derive(Clone, Debug)]
pub struct CorpusRecord {
    /// Audio source path.
    pub src: PathBuf,
    /// Transcript from the vocabulary's column.
    pub transcript: String,
    /// Duration in seconds, as declared by the manifest.
    pub duration: f64,
    /// Partition tag.
    pub partition: Partition,
}

/// Read and parse a manifest file.
pub fn read_manifest(path: impl AsRef<Path>, vocab_type: VocabType) -> Result<Vec<CorpusRecord>> {
    let text = fs::read_to_string(path)?;
    parse_manifest(&text, vocab_type)
}

/// Parse manifest text. Line numbers in errors are 1-based.
pub fn parse_manifest(text: &str, vocab_type: VocabType) -> Result<Vec<CorpusRecord>> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| DataError::MissingColumn("src".to_string()))?;
    let columns: Vec<&str> = header.split('\t').collect();

    let col = |name: &str| -> Result<usize> {
        columns
            .iter()
            .position(|&c| c == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()).into())
    };

    let src_col = col("src")?;
    let transcript_col = col(vocab_type.column())?;
    let duration_col = col("duration")?;
    let partition_col = col("data_type")?;

    fn field<'a>(fields: &[&'a str], idx: usize, line_no: usize) -> Result<&'a str> {
        fields.get(idx).copied().ok_or_else(|| {
            DataError::MalformedRow {
                line: line_no,
                reason: format!("expected at least {} columns, got {}", idx + 1, fields.len()),
            }
            .into()
        })
    }

    let mut records = Vec::new();
    for (i, line) in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        let line_no = i + 1;

        let duration: f64 = field(&fields, duration_col, line_no)?.parse().map_err(|_| {
            DataError::MalformedRow {
                line: line_no,
                reason: format!("duration is not a number: {:?}", fields[duration_col]),
            }
        })?;

        let partition: Partition = field(&fields, partition_col, line_no)?.parse()?;

        records.push(CorpusRecord {
            src: PathBuf::from(field(&fields, src_col, line_no)?),
            transcript: field(&fields, transcript_col, line_no)?.to_string(),
            duration,
            partition,
        });
    }

    Ok(records)
}

/// Keep records in `partition` with duration inside `[min, max]`.
///
/// Direct field comparison; partition matching is enum equality, never
/// string interpolation.
pub fn filter_records(
    records: Vec<CorpusRecord>,
    partition: Partition,
    min_duration: f64,
    max_duration: f64,
) -> Vec<CorpusRecord> {
    let total = records.len();
    let kept: Vec<CorpusRecord> = records
        .into_iter()
        .filter(|r| {
            r.partition == partition && r.duration >= min_duration && r.duration <= max_duration
        })
        .collect();

    tracing::debug!(
        total,
        kept = kept.len(),
        partition = %partition,
        min_duration,
        max_duration,
        "filtered manifest"
    );

    kept
}
