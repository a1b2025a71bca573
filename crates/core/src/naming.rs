use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::coverage::CoverageInterval;
use crate::error::CoreError;

/// Date format used for both ends of the interval in statement file names.
pub const FILE_DATE_FORMAT: &str = "%Y%m%d";

fn re_statement_file() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"^([0-9]{8})-([0-9]{8})--([0-9]+)\.ofx$").expect("invalid regex")
    })
}

fn re_invalid_name_chars() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[^a-zA-Z0-9.-]+").expect("invalid regex"))
}

/// Collapses every run of characters outside `[a-zA-Z0-9.-]` into a single `-`.
///
/// `.` and `..` are rejected since they would not name a subdirectory.
pub fn sanitize_account_name(account_name: &str) -> Result<String, CoreError> {
    if account_name == "." || account_name == ".." {
        return Err(CoreError::InvalidAccountName(account_name.to_string()));
    }
    Ok(re_invalid_name_chars()
        .replace_all(account_name, "-")
        .into_owned())
}

/// `<start:YYYYMMDD>-<end:YYYYMMDD>--<fetch_unix_timestamp>.ofx`
///
/// The timestamp only disambiguates repeated fetches; it carries no meaning
/// for coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementFileName {
    pub interval: CoverageInterval,
    pub fetched_at: i64,
}

impl fmt::Display for StatementFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}--{}.ofx",
            self.interval.start().format(FILE_DATE_FORMAT),
            self.interval.end().format(FILE_DATE_FORMAT),
            self.fetched_at
        )
    }
}

impl StatementFileName {
    pub fn new(interval: CoverageInterval, fetched_at: i64) -> Self {
        StatementFileName {
            interval,
            fetched_at,
        }
    }

    /// Fails with `NotStatementFile` for names outside the pattern, which
    /// callers are expected to ignore quietly, and with `InvalidInterval` /
    /// `InvalidFileDate` for names that match but encode a bad range.
    ///
    /// The whole name must match: suffixed copies such as
    /// `20240101-20240131--1706745600.ofx.bak` or in-flight temp files are
    /// not statements and never count towards coverage.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        let caps = re_statement_file()
            .captures(name)
            .ok_or_else(|| CoreError::NotStatementFile(name.to_string()))?;

        let start = parse_file_date(name, &caps[1])?;
        let end = parse_file_date(name, &caps[2])?;
        // Digits only, so overflow is the single failure mode.
        let fetched_at = caps[3].parse::<i64>().unwrap_or(i64::MAX);

        Ok(StatementFileName {
            interval: CoverageInterval::new(start, end)?,
            fetched_at,
        })
    }
}

fn parse_file_date(name: &str, value: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(value, FILE_DATE_FORMAT).map_err(|_| CoreError::InvalidFileDate {
        name: name.to_string(),
        value: value.to_string(),
    })
}
