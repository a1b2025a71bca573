use std::fmt;
use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use finsync_core::{CoverageInterval, CoverageSet, SyncOptions};
use finsync_ofx::{extract_date_range, Clock, DateRangeOutcome, StatementSource, Transport};
use finsync_storage::StatementStore;

use crate::error::SyncError;

/// Why synchronization of one account stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The most recent interval starts within `min_days_retrieved` of today.
    CaughtUp,
    /// A request did not extend past the interval it was meant to extend.
    NoForwardProgress,
    /// A gap-fill request came back without a statement range.
    ServerStoppedResponding,
    /// Nothing on disk and the bootstrap search found no servable window.
    NoData,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::CaughtUp => write!(f, "caught up"),
            SyncOutcome::NoForwardProgress => write!(f, "no newer data"),
            SyncOutcome::ServerStoppedResponding => write!(f, "server returned no data"),
            SyncOutcome::NoData => write!(f, "no data available"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub account: String,
    pub directory: PathBuf,
    pub files_written: Vec<PathBuf>,
    pub requests: usize,
    pub outcome: SyncOutcome,
}

/// Incrementally downloads one account's statement history into its store.
///
/// State between runs lives only in the store's file names. A run with an
/// empty store first binary-searches for the earliest date the server will
/// serve; every run then fills gaps and extends towards today, re-requesting
/// `overlap_days` of already-covered history each time.
#[derive(Debug, Clone)]
pub struct Synchronizer<C: Clock> {
    transport: Transport<C>,
    options: SyncOptions,
}

/// Mutable state of one run.
struct Run<'a> {
    store: &'a StatementStore,
    coverage: CoverageSet,
    files_written: Vec<PathBuf>,
    requests: usize,
}

impl<C: Clock> Synchronizer<C> {
    pub fn new(transport: Transport<C>, options: SyncOptions) -> Self {
        Self { transport, options }
    }

    pub async fn sync_account<A: StatementSource>(
        &self,
        account: &A,
        store: &StatementStore,
    ) -> Result<SyncReport, SyncError> {
        let mut run = Run {
            store,
            coverage: store.load_coverage()?,
            files_written: Vec::new(),
            requests: 0,
        };

        if run.coverage.is_empty() {
            match self.find_earliest_data(account, &mut run).await? {
                Some((interval, data)) => self.save(&mut run, interval, &data)?,
                None => {
                    tracing::warn!(
                        "Failed to retrieve any data for account: {}",
                        account.number()
                    );
                    return Ok(self.report(account, run, SyncOutcome::NoData));
                }
            }
        }

        let outcome = self.extend_coverage(account, &mut run).await?;
        Ok(self.report(account, run, outcome))
    }

    /// Earliest window the server answers with a statement range.
    ///
    /// `min_start_date` is tried as-is first. Otherwise the search keeps
    /// `lower` at a date known to return nothing and moves `upper` down to
    /// each date that did return data, until the two are a day apart.
    async fn find_earliest_data<A: StatementSource>(
        &self,
        account: &A,
        run: &mut Run<'_>,
    ) -> Result<Option<(CoverageInterval, Vec<u8>)>, SyncError> {
        let min_start = self.options.min_start_date;
        let (outcome, data) = self.fetch(account, min_start, run).await?;
        if let DateRangeOutcome::Found(interval) = outcome {
            return Ok(Some((interval, data)));
        }

        tracing::info!(
            "Binary searching to find earliest data available for account {}.",
            account.number()
        );
        let mut lower = min_start;
        let mut upper = self.transport.clock().today();
        let mut best = None;
        while (upper - lower).num_days() > 1 {
            let mid = midpoint(lower, upper);
            let (outcome, data) = self.fetch(account, mid, run).await?;
            match outcome {
                DateRangeOutcome::Found(interval) => {
                    upper = mid;
                    best = Some((interval, data));
                }
                DateRangeOutcome::NotFound { .. } => lower = mid,
            }
        }
        Ok(best)
    }

    /// Gap-fill and forward extension over a non-empty coverage set.
    async fn extend_coverage<A: StatementSource>(
        &self,
        account: &A,
        run: &mut Run<'_>,
    ) -> Result<SyncOutcome, SyncError> {
        let overlap = Days::new(u64::from(self.options.overlap_days));
        loop {
            let Some(target) = run.coverage.extension_target() else {
                return Ok(SyncOutcome::NoData);
            };
            let start = target.end().checked_sub_days(overlap).unwrap_or(NaiveDate::MIN);

            let (outcome, data) = self.fetch(account, start, run).await?;
            let DateRangeOutcome::Found(interval) = outcome else {
                tracing::warn!(
                    "Failed to retrieve newer data for account {}",
                    account.number()
                );
                return Ok(SyncOutcome::ServerStoppedResponding);
            };

            if interval.end() <= target.end() {
                if self.options.always_save {
                    self.save(run, interval, &data)?;
                } else {
                    tracing::info!(
                        "No data past {} for account {}; not saving {interval}",
                        target.end(),
                        account.number()
                    );
                }
                return Ok(SyncOutcome::NoForwardProgress);
            }

            self.save(run, interval, &data)?;
            if self.caught_up(&run.coverage) {
                return Ok(SyncOutcome::CaughtUp);
            }
        }
    }

    fn caught_up(&self, coverage: &CoverageSet) -> bool {
        let today = self.transport.clock().today();
        coverage.most_recent().is_some_and(|latest| {
            (today - latest.start()).num_days() <= i64::from(self.options.min_days_retrieved)
        })
    }

    async fn fetch<A: StatementSource>(
        &self,
        account: &A,
        start: NaiveDate,
        run: &mut Run<'_>,
    ) -> Result<(DateRangeOutcome, Vec<u8>), SyncError> {
        let data = self.transport.fetch(account, start).await?;
        run.requests += 1;
        Ok((extract_date_range(&data), data))
    }

    fn save(
        &self,
        run: &mut Run<'_>,
        interval: CoverageInterval,
        data: &[u8],
    ) -> Result<(), SyncError> {
        let fetched_at = self.transport.clock().unix_timestamp();
        let path = run.store.save(interval, data, fetched_at)?;
        run.coverage.insert(interval);
        run.files_written.push(path);
        Ok(())
    }

    fn report<A: StatementSource>(&self, account: &A, run: Run<'_>, outcome: SyncOutcome) -> SyncReport {
        SyncReport {
            account: account.number().to_string(),
            directory: run.store.dir().to_path_buf(),
            files_written: run.files_written,
            requests: run.requests,
            outcome,
        }
    }
}

fn midpoint(lower: NaiveDate, upper: NaiveDate) -> NaiveDate {
    let half = (upper - lower).num_days() / 2;
    lower + Days::new(u64::try_from(half).unwrap_or(0))
}
