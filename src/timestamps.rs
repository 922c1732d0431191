//! Timestamps file loading.
//!
//! A timestamps file lists one `start-end` pair per line, each side a
//! unit-suffixed duration such as `1m30s` or `2.5s`:
//!
//! ```text
//! # intro
//! 0s-2s
//! 1m5s-1m12.5s
//! ```
//!
//! Blank lines and `#` comments are skipped. The first malformed line fails
//! the whole load.

use std::path::Path;
use std::time::Duration;

use clipsplice_av::{Error, Result, TimeRange};

/// Separates the start and end of a range on one line.
pub const RANGE_SEPARATOR: char = '-';

/// Why a duration string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("negative duration {0:?}")]
    Negative(String),

    #[error("invalid number in duration {0:?}")]
    InvalidNumber(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("duration {0:?} is too large")]
    Overflow(String),
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

/// Parse a unit-suffixed duration such as `300ms`, `1.5h` or `2h45m`.
///
/// A bare `0` is accepted; any other number needs a unit. Negative
/// durations are rejected.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, DurationError> {
    if input.starts_with('-') {
        return Err(DurationError::Negative(input.to_string()));
    }
    let mut rest = input.strip_prefix('+').unwrap_or(input);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Empty);
    }

    let overflow = || DurationError::Overflow(input.to_string());
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let int_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (int_part, after) = rest.split_at(int_len);

        let (frac_part, after) = match after.strip_prefix('.') {
            Some(frac) => {
                let len = frac
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(frac.len());
                frac.split_at(len)
            }
            None => ("", after),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DurationError::InvalidNumber(input.to_string()));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let mut term = whole.checked_mul(scale).ok_or_else(overflow)?;

        // Digits past nanosecond resolution of the largest unit cannot matter.
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        if !frac_digits.is_empty() {
            let frac: u128 = frac_digits
                .parse()
                .map_err(|_| DurationError::InvalidNumber(input.to_string()))?;
            term = term
                .checked_add(frac * scale / 10u128.pow(frac_digits.len() as u32))
                .ok_or_else(overflow)?;
        }

        total = total.checked_add(term).ok_or_else(overflow)?;
        rest = after;
    }

    let nanos = u64::try_from(total).map_err(|_| overflow())?;
    Ok(Duration::from_nanos(nanos))
}

/// Parse one `start-end` line.
pub fn parse_line(line: &str) -> Result<TimeRange> {
    let fields: Vec<&str> = line.split(RANGE_SEPARATOR).map(str::trim).collect();
    let [start, end] = fields.as_slice() else {
        return Err(Error::InvalidInput(format!(
            "expected `start{RANGE_SEPARATOR}end`, got {line:?}"
        )));
    };

    let start = parse_duration(start).map_err(|e| Error::InvalidInput(e.to_string()))?;
    let end = parse_duration(end).map_err(|e| Error::InvalidInput(e.to_string()))?;
    TimeRange::new(start, end)
}

/// Parse a whole timestamps file body, keeping file order.
pub fn parse_timestamps(content: &str) -> Result<Vec<TimeRange>> {
    let mut ranges = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let range = parse_line(line).map_err(|e| Error::Timestamp {
            line: i + 1,
            message: e.to_string(),
        })?;
        ranges.push(range);
    }

    Ok(ranges)
}

/// Read and parse a timestamps file. A file with no ranges is an error.
pub fn load_timestamps(path: &Path) -> Result<Vec<TimeRange>> {
    let content = std::fs::read_to_string(path)?;
    let ranges = parse_timestamps(&content)?;

    if ranges.is_empty() {
        return Err(Error::InvalidInput(format!(
            "no time ranges in {}",
            path.display()
        )));
    }

    tracing::debug!("loaded {} ranges from {}", ranges.len(), path.display());
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("2s").unwrap(), secs(2.0));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("1h").unwrap(), secs(3600.0));
        assert_eq!(parse_duration("15us").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("15µs").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn parses_compound_and_fractional() {
        assert_eq!(parse_duration("1m30s").unwrap(), secs(90.0));
        assert_eq!(parse_duration("2h45m").unwrap(), secs(9900.0));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(".5m").unwrap(), secs(30.0));
        assert_eq!(
            parse_duration("1m12.25s").unwrap(),
            Duration::from_millis(72_250)
        );
        assert_eq!(parse_duration("+4s").unwrap(), secs(4.0));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_matches!(parse_duration(""), Err(DurationError::Empty));
        assert_matches!(parse_duration("-3s"), Err(DurationError::Negative(_)));
        assert_matches!(parse_duration("12"), Err(DurationError::MissingUnit(_)));
        assert_matches!(parse_duration("1.5.3s"), Err(DurationError::MissingUnit(_)));
        assert_matches!(parse_duration("s"), Err(DurationError::InvalidNumber(_)));
        assert_matches!(parse_duration("."), Err(DurationError::InvalidNumber(_)));
        assert_matches!(
            parse_duration("3d"),
            Err(DurationError::UnknownUnit { ref unit, .. }) if unit == "d"
        );
        assert_matches!(
            parse_duration("99999999999999999999h"),
            Err(DurationError::Overflow(_))
        );
        assert_matches!(
            parse_duration("94522879700260684295381835.9h"),
            Err(DurationError::Overflow(_))
        );
    }

    #[test]
    fn parses_range_line() {
        let range = parse_line("1m5s-1m12.5s").unwrap();
        assert_eq!(range.start(), secs(65.0));
        assert_eq!(range.end(), secs(72.5));

        let spaced = parse_line(" 0s - 2s ").unwrap();
        assert_eq!(spaced.length(), secs(2.0));
    }

    #[test]
    fn rejects_bad_range_lines() {
        assert_matches!(parse_line("2s"), Err(Error::InvalidInput(_)));
        assert_matches!(parse_line("1s-2s-3s"), Err(Error::InvalidInput(_)));
        assert_matches!(parse_line("abc-2s"), Err(Error::InvalidInput(_)));
        assert_matches!(parse_line("5s-2s"), Err(Error::InvalidRange(_)));
        assert_matches!(parse_line("2s-2s"), Err(Error::InvalidRange(_)));
    }

    #[test]
    fn parses_file_in_order_skipping_blanks_and_comments() {
        let content = "# highlights\n0s-2s\n\n5s-7s\n   \n1m-1m1s\n";
        let ranges = parse_timestamps(content).unwrap();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].start(), Duration::ZERO);
        assert_eq!(ranges[1].start(), secs(5.0));
        assert_eq!(ranges[2].end(), secs(61.0));
    }

    #[test]
    fn bad_line_fails_whole_load_with_line_number() {
        let content = "0s-2s\n5s-7x\n9s-10s\n";
        assert_matches!(
            parse_timestamps(content),
            Err(Error::Timestamp { line: 2, .. })
        );
    }

    #[test]
    fn load_rejects_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            load_timestamps(&dir.path().join("missing.txt")),
            Err(Error::Io(_))
        );

        let empty = dir.path().join("timestamps.txt");
        std::fs::write(&empty, "# nothing yet\n").unwrap();
        assert_matches!(load_timestamps(&empty), Err(Error::InvalidInput(_)));
    }

    #[test]
    fn load_reads_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timestamps.txt");
        std::fs::write(&path, "0s-2s\n5s-7s\n").unwrap();

        let ranges = load_timestamps(&path).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].length(), secs(2.0));
    }
}
