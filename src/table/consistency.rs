//! Field-count consistency check for dataset files.
//!
//! Used by the `check` CLI command to find the lines that make a strict load
//! fail, without stopping at the first one.

use std::{io::Read, path::Path};

/// A data line whose field count differs from the header's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InconsistentLine {
    /// 1-based line number; the header is line 1.
    pub line: u64,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyReport {
    /// The file has no header row.
    Empty,
    Checked {
        expected_fields: usize,
        records: usize,
        inconsistent: Vec<InconsistentLine>,
    },
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        matches!(self, Self::Checked { inconsistent, .. } if inconsistent.is_empty())
    }
}

/// Compare every record's field count with the header's.
///
/// A blank line is a record with no fields, so it is always reported. The
/// csv reader skips blank lines, so they are recovered from the bytes between
/// consecutive records.
pub fn check_consistency(mut reader: impl Read) -> Result<ConsistencyReport, csv::Error> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_slice());

    let mut record = csv::StringRecord::new();
    if !csv_reader.read_record(&mut record)? {
        return Ok(ConsistencyReport::Empty);
    }
    let expected_fields = record.len();

    let mut inconsistent = Vec::new();
    let mut count = 0;
    loop {
        let gap_start = csv_reader.position().clone();
        let more = csv_reader.read_record(&mut record)?;

        let (blank_lines, line) = skipped_blank_lines(&data, &gap_start);
        count += blank_lines.len();
        inconsistent.extend(blank_lines.into_iter().map(|line| InconsistentLine {
            line,
            fields: Vec::new(),
        }));

        if !more {
            break;
        }
        count += 1;
        if record.len() != expected_fields {
            inconsistent.push(InconsistentLine {
                line,
                fields: record.iter().map(String::from).collect(),
            });
        }
    }

    Ok(ConsistencyReport::Checked {
        expected_fields,
        records: count,
        inconsistent,
    })
}

/// Line numbers of the blank lines starting at `from`, and the line the next
/// record starts on.
///
/// A blank line starts at a `\r`, or at a `\n` not preceded by `\r`. Lines
/// are counted on `\n`, as the csv reader counts them. After a CRLF record the
/// reader stops before the `\n`, which then belongs to the previous line.
fn skipped_blank_lines(data: &[u8], from: &csv::Position) -> (Vec<u64>, u64) {
    let offset = usize::try_from(from.byte()).map_or(data.len(), |o| o.min(data.len()));
    let mut prev = offset.checked_sub(1).map(|i| data[i]);
    let mut line = from.line();
    let mut blank = Vec::new();

    for &byte in data[offset..]
        .iter()
        .take_while(|b| matches!(b, b'\r' | b'\n'))
    {
        if byte == b'\r' || prev != Some(b'\r') {
            blank.push(line);
        }
        if byte == b'\n' {
            line += 1;
        }
        prev = Some(byte);
    }

    (blank, line)
}

/// Run [`check_consistency`] against a file on disk.
pub fn check_file_consistency(path: impl AsRef<Path>) -> Result<ConsistencyReport, super::LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(super::LoadError::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    Ok(check_consistency(file)?)
}
