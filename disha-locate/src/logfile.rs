//! RSS survey log validation and parsing.
//!
//! A survey log is a plain text file:
//!
//! ```text
//! # Timestamp, X, Y, <mac1>, <mac2>, ...
//! 1318289019243, 1.0, 2.0, 00:0b:6b:3c:5a:42, -48
//! 1318289019243, 1.0, 2.0, 00:0b:6b:3c:5a:7f, -63
//! ```
//!
//! (outdoor surveys carry `Latitude, Longitude` axis labels instead).
//! Fields may be separated by `", "` or plain whitespace; parsing
//! normalizes the former to the latter.
//!
//! Validation is all-or-nothing: a single malformed line rejects the
//! whole file. Aggregation treats a rejected file as a soft failure and
//! moves on to the next one.

use crate::error::{Error, Result};
use crate::types::{AxisMode, Sample};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Replace the canonical `", "` separators with plain spaces so that a
/// single whitespace split handles both spellings.
pub(crate) fn normalize_separators(line: &str) -> String {
    line.replace(", ", " ")
}

/// True if `s` is a colon-separated six-octet hex MAC address
/// (e.g. `00:0b:6b:3c:5a:42`).
pub fn is_valid_mac(s: &str) -> bool {
    let mut octets = 0;
    for octet in s.split(':') {
        if octet.len() != 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
        octets += 1;
    }
    octets == 6
}

fn format_error(path: &Path, line: usize, reason: impl Into<String>) -> Error {
    Error::LogFormat {
        path: path.display().to_string(),
        line,
        reason: reason.into(),
    }
}

/// Check a header line against the axis labels of `mode`.
///
/// After separator normalization the header must split into at least
/// four fields, with the expected axis labels in the third and fourth
/// position: `# Timestamp X Y ...`.
fn check_header(path: &Path, line_num: usize, line: &str, mode: AxisMode) -> Result<()> {
    let normalized = normalize_separators(line);
    let fields: Vec<&str> = normalized.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(format_error(
            path,
            line_num,
            format!("header has {} fields, expected at least 4", fields.len()),
        ));
    }
    let (first, second) = mode.axis_labels();
    if !fields[2].eq_ignore_ascii_case(first) || !fields[3].eq_ignore_ascii_case(second) {
        return Err(format_error(
            path,
            line_num,
            format!(
                "header axis labels '{} {}' do not match {} mode ('{} {}')",
                fields[2], fields[3], mode, first, second
            ),
        ));
    }
    Ok(())
}

/// Parse one data row `timestamp x y mac rss` into a [`Sample`].
fn parse_data_row(path: &Path, line_num: usize, line: &str) -> Result<Sample> {
    let normalized = normalize_separators(line);
    let fields: Vec<&str> = normalized.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format_error(
            path,
            line_num,
            format!("row has {} fields, expected 5", fields.len()),
        ));
    }
    fields[1]
        .parse::<f64>()
        .map_err(|_| format_error(path, line_num, format!("'{}' is not a coordinate", fields[1])))?;
    fields[2]
        .parse::<f64>()
        .map_err(|_| format_error(path, line_num, format!("'{}' is not a coordinate", fields[2])))?;
    if !is_valid_mac(fields[3]) {
        return Err(format_error(
            path,
            line_num,
            format!("'{}' is not a MAC address", fields[3]),
        ));
    }
    let rss: i32 = fields[4]
        .parse()
        .map_err(|_| format_error(path, line_num, format!("'{}' is not an RSS integer", fields[4])))?;

    // The location key is the verbatim coordinate text, not a parsed value.
    Ok(Sample {
        location: format!("{} {}", fields[1], fields[2]),
        mac: fields[3].to_string(),
        rss,
    })
}

/// Validate and parse a whole survey log.
///
/// The first non-blank line must be a `#` header matching the axis
/// labels of `mode`; any further `#` lines are re-checked the same way.
/// Every data row must parse as `timestamp x y mac rss`. The first
/// violation rejects the entire file.
pub fn parse_log_file(path: &Path, mode: AxisMode) -> Result<Vec<Sample>> {
    let reader = BufReader::new(File::open(path)?);
    let mut samples = Vec::new();
    let mut seen_header = false;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = idx + 1;

        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('#') {
            check_header(path, line_num, &line, mode)?;
            seen_header = true;
            continue;
        }

        if !seen_header {
            return Err(format_error(path, line_num, "data before header line"));
        }

        samples.push(parse_data_row(path, line_num, &line)?);
    }

    Ok(samples)
}

/// Validate a survey log without keeping its samples.
pub fn validate_log_file(path: &Path, mode: AxisMode) -> Result<()> {
    parse_log_file(path, mode).map(|_| ())
}
