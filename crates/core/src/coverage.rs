use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A date span, inclusive at both ends, that one server response claimed to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoverageInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl fmt::Display for CoverageInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.start, self.end)
    }
}

impl CoverageInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidInterval { start, end });
        }
        Ok(CoverageInterval { start, end })
    }

    pub fn start(self) -> NaiveDate {
        self.start
    }

    pub fn end(self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days from start to end (zero for a single-day interval).
    pub fn span_days(self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Uncovered days strictly between two neighbouring intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub first_missing: NaiveDate,
    pub last_missing: NaiveDate,
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.first_missing, self.last_missing)
    }
}

/// All intervals known for one account, ordered by start date.
///
/// Overlapping and duplicate intervals are kept as-is: each one corresponds
/// to a separate file on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageSet {
    intervals: Vec<CoverageInterval>,
}

impl CoverageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_intervals(mut intervals: Vec<CoverageInterval>) -> Self {
        intervals.sort();
        CoverageSet { intervals }
    }

    pub fn insert(&mut self, interval: CoverageInterval) {
        let at = self.intervals.partition_point(|existing| *existing <= interval);
        self.intervals.insert(at, interval);
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoverageInterval> {
        self.intervals.iter()
    }

    /// The interval with the latest start date.
    pub fn most_recent(&self) -> Option<CoverageInterval> {
        self.intervals.last().copied()
    }

    /// Picks the interval whose end should be extended next.
    ///
    /// That is the first interval that does not overlap its successor (a gap,
    /// or an exact abutment), or the last interval when every neighbouring
    /// pair overlaps.
    pub fn extension_target(&self) -> Option<CoverageInterval> {
        self.intervals
            .windows(2)
            .find(|pair| pair[0].end <= pair[1].start)
            .map(|pair| pair[0])
            .or_else(|| self.most_recent())
    }

    /// Date ranges not covered by any interval, between the earliest start and latest end.
    pub fn gaps(&self) -> Vec<Gap> {
        let mut gaps = Vec::new();
        let mut covered_until: Option<NaiveDate> = None;
        for interval in &self.intervals {
            if let Some(until) = covered_until {
                if let (Some(first), Some(last)) = (
                    until.checked_add_days(Days::new(1)),
                    interval.start.checked_sub_days(Days::new(1)),
                ) {
                    if first <= last {
                        gaps.push(Gap {
                            first_missing: first,
                            last_missing: last,
                        });
                    }
                }
            }
            covered_until = Some(match covered_until {
                Some(until) => until.max(interval.end),
                None => interval.end,
            });
        }
        gaps
    }
}
