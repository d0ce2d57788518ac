//! Per-client token bucket admission control.
//!
//! Every client gets a bucket holding up to `burst` tokens. Buckets refill
//! lazily on each call at `requests_per_window / window` tokens per second,
//! so there is no timer per client. A background sweep drops buckets that
//! have been idle for more than two windows; a dropped client simply starts
//! over with a full bucket.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{AppError, ConfigError};
use crate::metrics::{RATE_LIMITED_TOTAL, TRACKED_CLIENTS};
use crate::state::AppState;

// Source of "now" for refill and sweep arithmetic
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// Token bucket for one client
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    // set by the sweep under the bucket lock once it leaves the map
    evicted: bool,
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Admitted,
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

pub struct TokenBucketLimiter<C: Clock = SystemClock> {
    clients: DashMap<String, Arc<Mutex<TokenBucket>>>,
    rate: f64, // tokens per second
    burst: u32,
    window: Duration,
    clock: C,
}

impl TokenBucketLimiter {
    pub fn new(requests_per_window: u32, window: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(requests_per_window, window, SystemClock)
    }
}

impl<C: Clock> TokenBucketLimiter<C> {
    pub fn with_clock(
        requests_per_window: u32,
        window: Duration,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let burst = NonZeroU32::new(requests_per_window).ok_or(ConfigError::NotPositive {
            field: "requests per window",
        })?;
        if window.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "rate limit window",
            });
        }

        Ok(Self {
            clients: DashMap::new(),
            rate: f64::from(burst.get()) / window.as_secs_f64(),
            burst: burst.get(),
            window,
            clock,
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    fn bucket(&self, client: &str) -> Arc<Mutex<TokenBucket>> {
        if let Some(bucket) = self.clients.get(client) {
            return Arc::clone(bucket.value());
        }

        let bucket = self
            .clients
            .entry(client.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(TokenBucket {
                    tokens: f64::from(self.burst),
                    last_refill: self.clock.now(),
                    evicted: false,
                }))
            });
        Arc::clone(bucket.value())
    }

    /// Refills the client's bucket for the time elapsed since its last
    /// refill, then takes one token if at least one is available.
    ///
    /// A denial debits nothing and reports how long the client has to wait
    /// for the missing fraction of a token at the configured rate.
    pub fn allow(&self, client: &str) -> Admission {
        loop {
            let bucket = self.bucket(client);
            let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            // swept between lookup and lock, debit the bucket now in the map instead
            if bucket.evicted {
                continue;
            }
            return self.take(&mut bucket);
        }
    }

    fn take(&self, bucket: &mut TokenBucket) -> Admission {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.rate).min(f64::from(self.burst));
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Admission::Admitted;
        }

        let deficit = 1.0 - bucket.tokens;
        let nanos = (deficit / self.rate * 1e9).ceil() as u64;
        Admission::Denied {
            retry_after: Duration::from_nanos(nanos),
        }
    }

    /// Removes every bucket not refilled within the last two windows and
    /// returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let max_idle = self.window * 2;
        let before = self.clients.len();

        self.clients.retain(|_, bucket| {
            let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            let keep = now.saturating_duration_since(bucket.last_refill) <= max_idle;
            bucket.evicted = !keep;
            keep
        });

        let remaining = self.clients.len();
        TRACKED_CLIENTS.set(remaining as f64);
        before.saturating_sub(remaining)
    }
}

impl<C: Clock + 'static> TokenBucketLimiter<C> {
    /// Runs [`sweep`](Self::sweep) once per window until `cancel` fires.
    pub fn spawn_cleanup(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(limiter.window);
            // the first tick completes immediately
            ticker.tick().await;

            info!("Rate limiter cleanup started (interval: {:?})", limiter.window);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        if removed > 0 {
                            debug!(
                                removed,
                                tracked = limiter.tracked_clients(),
                                "Dropped idle rate limit buckets"
                            );
                        }
                    }
                }
            }
            info!("Rate limiter cleanup stopped");
        })
    }
}

/// Rejects requests from clients that are over budget with 429 and a retry hint.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(limiter) = &state.limiter else {
        return Ok(next.run(request).await);
    };

    let client = request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.allow(&client) {
        Admission::Admitted => Ok(next.run(request).await),
        Admission::Denied { retry_after } => {
            RATE_LIMITED_TOTAL.inc();
            debug!(%client, ?retry_after, "Rate limit exceeded");
            Err(AppError::RateLimited { retry_after })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // Clock that only moves when told to
    #[derive(Clone)]
    pub(crate) struct ManualClock(Arc<Mutex<Instant>>);

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self(Arc::new(Mutex::new(Instant::now())))
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    fn limiter(burst: u32, window_secs: u64) -> (TokenBucketLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let limiter =
            TokenBucketLimiter::with_clock(burst, Duration::from_secs(window_secs), clock.clone())
                .unwrap();
        (limiter, clock)
    }

    #[test]
    fn rejects_zero_requests_or_window() {
        assert!(TokenBucketLimiter::new(0, Duration::from_secs(5)).is_err());
        assert!(TokenBucketLimiter::new(5, Duration::ZERO).is_err());
    }

    #[test]
    fn derives_rate_from_window() {
        let (limiter, _) = limiter(10, 5);
        assert_eq!(limiter.burst(), 10);
        assert_eq!(limiter.rate(), 2.0);
    }

    #[test]
    fn fresh_bucket_admits_exactly_burst() {
        let (limiter, clock) = limiter(5, 5);

        for _ in 0..5 {
            assert_eq!(limiter.allow("10.0.0.1"), Admission::Admitted);
        }
        assert_eq!(
            limiter.allow("10.0.0.1"),
            Admission::Denied {
                retry_after: Duration::from_secs(1)
            }
        );

        clock.advance(Duration::from_secs(1));
        assert_eq!(limiter.allow("10.0.0.1"), Admission::Admitted);
    }

    #[test]
    fn denial_does_not_debit() {
        let (limiter, _) = limiter(1, 4);

        assert!(limiter.allow("a").is_admitted());
        let first = limiter.allow("a");
        let second = limiter.allow("a");
        assert_eq!(first, second);
    }

    #[test]
    fn waiting_out_retry_after_admits() {
        let (limiter, clock) = limiter(4, 2);

        for _ in 0..4 {
            assert!(limiter.allow("c").is_admitted());
        }
        clock.advance(Duration::from_millis(200));

        let Admission::Denied { retry_after } = limiter.allow("c") else {
            panic!("bucket should be empty");
        };
        assert_eq!(retry_after, Duration::from_millis(300));

        clock.advance(retry_after);
        assert!(limiter.allow("c").is_admitted());
    }

    #[test]
    fn refill_is_capped_at_burst() {
        let (limiter, clock) = limiter(3, 3);

        assert!(limiter.allow("d").is_admitted());
        clock.advance(Duration::from_secs(3600));

        for _ in 0..3 {
            assert!(limiter.allow("d").is_admitted());
        }
        assert!(!limiter.allow("d").is_admitted());
    }

    #[test]
    fn clients_are_independent() {
        let (limiter, _) = limiter(1, 10);

        assert!(limiter.allow("10.0.0.1").is_admitted());
        assert!(!limiter.allow("10.0.0.1").is_admitted());
        assert!(limiter.allow("10.0.0.2").is_admitted());
    }

    #[test]
    fn sweep_waits_for_two_idle_windows() {
        let (limiter, clock) = limiter(5, 5);

        assert!(limiter.allow("10.0.0.2").is_admitted());
        clock.advance(Duration::from_secs(10));
        assert_eq!(limiter.sweep(), 0);
        assert_eq!(limiter.tracked_clients(), 1);

        clock.advance(Duration::from_millis(1));
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn swept_client_starts_with_full_bucket() {
        let (limiter, clock) = limiter(2, 1);

        assert!(limiter.allow("e").is_admitted());
        assert!(limiter.allow("e").is_admitted());
        assert!(!limiter.allow("e").is_admitted());

        clock.advance(Duration::from_secs(3));
        assert_eq!(limiter.sweep(), 1);

        assert!(limiter.allow("e").is_admitted());
        assert!(limiter.allow("e").is_admitted());
        assert!(!limiter.allow("e").is_admitted());
    }

    #[test]
    fn bucket_swept_after_lookup_is_not_debited() {
        let (limiter, clock) = limiter(1, 1);

        assert!(limiter.allow("f").is_admitted());
        clock.advance(Duration::from_secs(3));

        // a caller that looked the bucket up just before the sweep
        let stale = limiter.bucket("f");
        assert_eq!(limiter.sweep(), 1);
        assert!(stale.lock().unwrap().evicted);

        assert!(limiter.allow("f").is_admitted());
        assert!(!limiter.allow("f").is_admitted());
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn concurrent_callers_share_one_budget() {
        let (limiter, _) = limiter(50, 60);
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..20).filter(|_| limiter.allow("shared").is_admitted()).count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }

    #[tokio::test]
    async fn cleanup_task_stops_on_cancel() {
        let limiter = Arc::new(TokenBucketLimiter::new(5, Duration::from_millis(10)).unwrap());
        let cancel = CancellationToken::new();

        let handle = limiter.spawn_cleanup(cancel.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cleanup task should exit")
            .unwrap();
    }
}
