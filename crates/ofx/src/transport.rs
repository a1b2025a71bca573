use std::sync::Arc;

use chrono::NaiveDate;

use crate::account::StatementSource;
use crate::error::OfxError;
use crate::throttle::{Clock, RateLimiter};

/// Issues single statement downloads, from a start date through today.
///
/// No retries: any error from the account is returned as-is.
#[derive(Debug, Clone)]
pub struct Transport<C: Clock> {
    clock: C,
    limiter: Option<Arc<RateLimiter<C>>>,
}

impl<C: Clock> Transport<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            limiter: None,
        }
    }

    /// Every transport built from the same limiter shares its spacing.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter<C>>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub async fn fetch<A: StatementSource>(
        &self,
        account: &A,
        start: NaiveDate,
    ) -> Result<Vec<u8>, OfxError> {
        tracing::info!(
            "Trying to retrieve data for {} starting at {}.",
            account.number(),
            start
        );
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await),
            None => None,
        };
        // Computed after any throttling wait so the window always ends today.
        let days = (self.clock.today() - start).num_days().max(0);
        let days = u32::try_from(days).unwrap_or(u32::MAX);
        account.download(days).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throttle::ManualClock;
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingAccount {
        requested: Mutex<Vec<u32>>,
        fail: bool,
    }

    impl RecordingAccount {
        fn new(fail: bool) -> Self {
            Self {
                requested: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl StatementSource for RecordingAccount {
        fn number(&self) -> &str {
            "12345"
        }

        async fn download(&self, days: u32) -> Result<Vec<u8>, OfxError> {
            self.requested.lock().unwrap().push(days);
            if self.fail {
                return Err(OfxError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(b"<OFX></OFX>".to_vec())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn days_are_counted_back_from_today() {
        let clock = ManualClock::new(date(2024, 1, 15));
        let transport = Transport::new(clock.clone());
        let account = RecordingAccount::new(false);

        transport.fetch(&account, date(2024, 1, 1)).await.unwrap();
        clock.set_today(date(2024, 1, 16));
        transport.fetch(&account, date(2024, 1, 1)).await.unwrap();
        transport.fetch(&account, date(2024, 2, 1)).await.unwrap();

        assert_eq!(*account.requested.lock().unwrap(), vec![14, 15, 0]);
    }

    #[tokio::test]
    async fn errors_propagate_without_retry() {
        let clock = ManualClock::new(date(2024, 1, 15));
        let transport = Transport::new(clock);
        let account = RecordingAccount::new(true);

        let err = transport.fetch(&account, date(2024, 1, 1)).await.unwrap_err();
        assert!(matches!(err, OfxError::Status { status: 503, .. }));
        assert_eq!(account.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn limiter_is_shared_between_transports() {
        let clock = ManualClock::new(date(2024, 1, 15));
        let limiter = Arc::new(RateLimiter::new(clock.clone(), Duration::from_secs(5)));
        let first = Transport::new(clock.clone()).with_limiter(Arc::clone(&limiter));
        let second = Transport::new(clock.clone()).with_limiter(limiter);
        let account = RecordingAccount::new(false);

        first.fetch(&account, date(2024, 1, 1)).await.unwrap();
        second.fetch(&account, date(2024, 1, 1)).await.unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn failed_request_still_counts_for_spacing() {
        let clock = ManualClock::new(date(2024, 1, 15));
        let limiter = Arc::new(RateLimiter::new(clock.clone(), Duration::from_secs(5)));
        let transport = Transport::new(clock.clone()).with_limiter(limiter);

        let _ = transport.fetch(&RecordingAccount::new(true), date(2024, 1, 1)).await;
        transport
            .fetch(&RecordingAccount::new(false), date(2024, 1, 1))
            .await
            .unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }
}
