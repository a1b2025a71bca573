use chrono::NaiveDate;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};

/// Source of time for the transport and rate limiter.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn today(&self) -> NaiveDate;
    fn unix_timestamp(&self) -> i64;
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

// ── Manual clock (always available, used for tests) ──────────────────────────

#[derive(Debug)]
struct ManualState {
    today: NaiveDate,
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

/// A clock that only moves when told to. `sleep` returns immediately after
/// advancing the clock, so throttled code runs instantly under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    origin_unix: i64,
    state: Arc<StdMutex<ManualState>>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        let origin_unix = today
            .and_hms_opt(12, 0, 0)
            .map(|t| t.and_utc().timestamp())
            .unwrap_or_default();
        Self {
            origin: Instant::now(),
            origin_unix,
            state: Arc::new(StdMutex::new(ManualState {
                today,
                elapsed: Duration::ZERO,
                sleeps: Vec::new(),
            })),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn advance(&self, by: Duration) {
        self.state().elapsed += by;
    }

    pub fn set_today(&self, today: NaiveDate) {
        self.state().today = today;
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state().elapsed
    }

    fn today(&self) -> NaiveDate {
        self.state().today
    }

    fn unix_timestamp(&self) -> i64 {
        let elapsed = i64::try_from(self.state().elapsed.as_secs()).unwrap_or(i64::MAX);
        self.origin_unix.saturating_add(elapsed)
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        {
            let mut state = self.state();
            state.elapsed += duration;
            state.sleeps.push(duration);
        }
        std::future::ready(())
    }
}

// ── Rate limiter ─────────────────────────────────────────────────────────────

/// Enforces a minimum gap between the end of one request and the start of
/// the next, for every account of one institution.
///
/// Share it with `Arc`. The permit is held for the whole request, so
/// concurrent callers are serialized.
#[derive(Debug)]
pub struct RateLimiter<C: Clock> {
    clock: C,
    min_interval: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_finished: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn acquire(&self) -> RatePermit<'_, C> {
        let guard = self.last_finished.lock().await;
        if let Some(last) = *guard {
            let since = self.clock.now().saturating_duration_since(last);
            if since < self.min_interval {
                let wait = self.min_interval - since;
                tracing::debug!(
                    "Throttling: {:.1}s since last request, waiting {:.1}s",
                    since.as_secs_f64(),
                    wait.as_secs_f64()
                );
                self.clock.sleep(wait).await;
            }
        }
        RatePermit {
            guard,
            clock: &self.clock,
        }
    }
}

/// Dropping the permit marks the request as finished.
pub struct RatePermit<'a, C: Clock> {
    guard: MutexGuard<'a, Option<Instant>>,
    clock: &'a C,
}

impl<C: Clock> Drop for RatePermit<'_, C> {
    fn drop(&mut self) {
        *self.guard = Some(self.clock.now());
    }
}
