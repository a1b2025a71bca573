use chrono::{NaiveDate, NaiveDateTime};
use finsync_core::CoverageInterval;

use crate::sgml;

/// Result of looking for the covered interval in a statement response.
///
/// `NotFound` is the ordinary answer for a window the server has no data
/// for; it is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRangeOutcome {
    Found(CoverageInterval),
    NotFound { messages: Vec<String> },
}

impl DateRangeOutcome {
    pub fn interval(&self) -> Option<CoverageInterval> {
        match self {
            DateRangeOutcome::Found(interval) => Some(*interval),
            DateRangeOutcome::NotFound { .. } => None,
        }
    }
}

/// Reads the first `DTSTART` and `DTEND` of a response.
///
/// Both must be present, parse, and be in order. Anything else yields
/// `NotFound` carrying the server's `MESSAGE` elements for diagnostics.
pub fn extract_date_range(data: &[u8]) -> DateRangeOutcome {
    let text = String::from_utf8_lossy(data);

    let start = sgml::first_value(&text, "DTSTART").and_then(parse_ofx_time);
    let end = sgml::first_value(&text, "DTEND").and_then(parse_ofx_time);

    if let (Some(start), Some(end)) = (start, end) {
        match CoverageInterval::new(start.date(), end.date()) {
            Ok(interval) => return DateRangeOutcome::Found(interval),
            Err(e) => tracing::warn!("Ignoring response with reversed date range: {e}"),
        }
    }

    tracing::debug!("Data received: {:?}", text);
    let messages: Vec<String> = sgml::all_values(&text, "MESSAGE")
        .into_iter()
        .map(str::to_string)
        .collect();
    tracing::info!("Messages: {:?}", messages);
    DateRangeOutcome::NotFound { messages }
}

/// Parses `YYYYMMDDHHMMSS[.XXX][TZ]`. Values shorter than 14 characters are
/// read as a bare `YYYYMMDD`; fractional seconds and the zone are dropped.
pub fn parse_ofx_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.len() < 14 {
        let date = NaiveDate::parse_from_str(s.get(..8)?, "%Y%m%d").ok()?;
        return date.and_hms_opt(0, 0, 0);
    }
    NaiveDateTime::parse_from_str(s.get(..14)?, "%Y%m%d%H%M%S").ok()
}
