//! Reading finished logs back for display

use std::io::BufRead;
use std::path::Path;

use crate::error::{Error, Result};
use crate::logfile::DATA_START;

/// Parsed log file
#[derive(Debug, Clone, Default)]
pub struct LogContents {
    /// Header lines up to and including `DM_Start=`
    pub header: Vec<String>,
    /// `(adjusted_time, calibrated_value)` pairs in file order
    pub samples: Vec<(i64, f64)>,
    /// Body lines that could not be parsed, e.g. a torn final write
    pub skipped_lines: usize,
}

impl LogContents {
    /// Look up a `key=value` or `key: value` header entry
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header.iter().find_map(|line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('=').or_else(|| rest.strip_prefix(": ")))
        })
    }

    pub fn duration(&self) -> i64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.0 - first.0,
            _ => 0,
        }
    }
}

/// Read a log file from disk
pub fn read_log(path: impl AsRef<Path>) -> Result<LogContents> {
    let file = std::fs::File::open(path.as_ref())?;
    parse_log(std::io::BufReader::new(file))
}

/// Parse a log from any reader
pub fn parse_log<R: BufRead>(reader: R) -> Result<LogContents> {
    let mut contents = LogContents::default();
    let mut in_body = false;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');

        if !in_body {
            contents.header.push(line.to_string());
            in_body = line == DATA_START;
            continue;
        }

        if line.is_empty() {
            continue;
        }

        match parse_sample_line(line) {
            Some(sample) => contents.samples.push(sample),
            None => contents.skipped_lines += 1,
        }
    }

    if !in_body {
        return Err(Error::InvalidLog(format!("no {} marker", DATA_START)));
    }

    Ok(contents)
}

fn parse_sample_line(line: &str) -> Option<(i64, f64)> {
    let (time, value) = line.split_once('\t')?;
    Some((time.trim().parse().ok()?, value.trim().parse().ok()?))
}
