//! Sliding-window rate limiter over per-key second buckets.
//!
//! Every key owns a queue of `{started, count}` buckets. A check drops the
//! buckets that left the window, compares the live sum to the limit and, if
//! there is room, records one unit in the newest bucket when it is less than a
//! second old, or in a fresh one otherwise.
//!
//! Check-then-record runs under the key's map entry lock, so concurrent calls
//! for one key are linearizable while different keys proceed independently.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::config::RateLimitConfig;

/// Requests landing within this span of a bucket's start share the bucket.
const BUCKET_SPAN: Duration = Duration::from_secs(1);

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
struct KeyWindow {
    buckets: VecDeque<Bucket>,
    limit: u32,
    window: Duration,
}

impl KeyWindow {
    fn new(limit: u32, window: Duration) -> Self {
        Self {
            buckets: VecDeque::new(),
            limit,
            window,
        }
    }

    fn is_live(&self, bucket: &Bucket, now: Instant) -> bool {
        now.duration_since(bucket.started) < self.window
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.buckets.front() {
            if self.is_live(front, now) {
                break;
            }
            self.buckets.pop_front();
        }
    }

    /// Units inside the window, without pruning.
    fn used(&self, now: Instant) -> u32 {
        self.buckets
            .iter()
            .filter(|b| self.is_live(b, now))
            .map(|b| b.count)
            .sum()
    }

    /// Records one unit and returns the start of the bucket that holds it.
    fn record(&mut self, now: Instant) -> Instant {
        if let Some(last) = self.buckets.back_mut()
            && now.duration_since(last.started) < BUCKET_SPAN
        {
            last.count += 1;
            return last.started;
        }

        self.buckets.push_back(Bucket {
            started: now,
            count: 1,
        });
        now
    }

    /// Time until the oldest live bucket leaves the window.
    fn reset_in(&self, now: Instant) -> Duration {
        self.buckets
            .iter()
            .find(|b| self.is_live(b, now))
            .map_or(Duration::ZERO, |b| {
                self.window.saturating_sub(now.duration_since(b.started))
            })
    }
}

/// Identifies the bucket an admitted unit was recorded in.
///
/// Handed back to [`SlidingWindowRateLimiter::release`] so a release only ever
/// returns the unit it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionTicket {
    bucket_started: Instant,
}

/// Outcome of a single [`SlidingWindowRateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Units left in the window after this call.
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    /// Present when the call was admitted.
    pub ticket: Option<AdmissionTicket>,
}

/// In-memory sliding-window limiter.
///
/// Construct one per engine and share it behind an `Arc`. Call
/// [`start_sweeper`](Self::start_sweeper) to evict idle keys periodically and
/// [`destroy`](Self::destroy) on shutdown.
pub struct SlidingWindowRateLimiter {
    windows: Arc<DashMap<String, KeyWindow>>,
    default_limit: u32,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl SlidingWindowRateLimiter {
    /// `default_limit` answers remaining-quota queries for keys that have never
    /// been checked.
    pub fn new(default_limit: u32) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            default_limit,
            sweeper: Mutex::new(None),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests)
    }

    /// Checks `key` against `limit` units per `window` and records one unit if
    /// allowed. A rejected call leaves the live buckets untouched.
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> RateLimitDecision {
        let now = Instant::now();

        if limit == 0 {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: wall_clock(window),
                ticket: None,
            };
        }

        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| KeyWindow::new(limit, window));

        entry.limit = limit;
        entry.window = window;
        entry.prune(now);

        let used = entry.used(now);
        if used >= limit {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: wall_clock(entry.reset_in(now)),
                ticket: None,
            };
        }

        let bucket_started = entry.record(now);

        RateLimitDecision {
            allowed: true,
            remaining: limit - used - 1,
            reset_at: wall_clock(entry.reset_in(now)),
            ticket: Some(AdmissionTicket { bucket_started }),
        }
    }

    pub fn is_allowed(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.check(key, limit, window).allowed
    }

    /// Units still available to `key` in its current window.
    pub fn get_remaining_requests(&self, key: &str) -> u32 {
        let now = Instant::now();
        self.windows.get(key).map_or(self.default_limit, |w| {
            w.limit.saturating_sub(w.used(now))
        })
    }

    /// When the oldest unit counted for `key` expires. Now, for idle keys.
    pub fn get_reset_time(&self, key: &str) -> DateTime<Utc> {
        let now = Instant::now();
        let reset_in = self
            .windows
            .get(key)
            .map_or(Duration::ZERO, |w| w.reset_in(now));
        wall_clock(reset_in)
    }

    /// Returns the unit admitted with `ticket` to `key`'s quota.
    ///
    /// Does nothing once that unit has left the window, so a late release can
    /// never free a unit recorded by a later call.
    pub fn release(&self, key: &str, ticket: AdmissionTicket) {
        let now = Instant::now();
        let Some(mut entry) = self.windows.get_mut(key) else {
            return;
        };

        let Some(index) = entry
            .buckets
            .iter()
            .position(|b| b.started == ticket.bucket_started)
        else {
            return;
        };

        if !entry.is_live(&entry.buckets[index], now) {
            return;
        }

        let bucket = &mut entry.buckets[index];
        bucket.count = bucket.count.saturating_sub(1);
        if bucket.count == 0 {
            entry.buckets.remove(index);
        }
    }

    /// Drops expired buckets and removes keys left empty. Returns the number of
    /// keys removed.
    pub fn sweep(&self) -> usize {
        sweep_windows(&self.windows)
    }

    /// Spawns the periodic sweep on the current tokio runtime, replacing any
    /// sweep already running.
    pub fn start_sweeper(&self, every: Duration) {
        let windows = Arc::clone(&self.windows);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = sweep_windows(&windows);
                if removed > 0 {
                    tracing::debug!(removed, remaining = windows.len(), "Swept idle rate limit keys");
                }
            }
        });

        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Stops the sweep and forgets every key.
    pub fn destroy(&self) {
        self.stop_sweeper();
        self.windows.clear();
        tracing::debug!("Rate limiter destroyed");
    }

    pub fn key_count(&self) -> usize {
        self.windows.len()
    }

    fn stop_sweeper(&self) {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl Drop for SlidingWindowRateLimiter {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

fn sweep_windows(windows: &DashMap<String, KeyWindow>) -> usize {
    let now = Instant::now();
    let mut removed = 0;

    windows.retain(|_, window| {
        window.prune(now);
        let keep = !window.buckets.is_empty();
        if !keep {
            removed += 1;
        }
        keep
    });

    removed
}

fn wall_clock(from_now: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(from_now)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn test_limit_then_recover() {
        let limiter = SlidingWindowRateLimiter::new(3);

        let results: Vec<bool> = (0..4).map(|_| limiter.is_allowed("k", 3, WINDOW)).collect();
        assert_eq!(results, vec![true, true, true, false]);

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert!(limiter.is_allowed("k", 3, WINDOW));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_and_reset() {
        let limiter = SlidingWindowRateLimiter::new(5);
        assert_eq!(limiter.get_remaining_requests("k"), 5);

        let decision = limiter.check("k", 5, WINDOW);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
        assert_eq!(limiter.get_remaining_requests("k"), 4);

        let reset = limiter.get_reset_time("k");
        assert!(reset > Utc::now());
        assert!(reset <= Utc::now() + chrono::Duration::milliseconds(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_coalesce_into_second_buckets() {
        let limiter = SlidingWindowRateLimiter::new(10);

        limiter.is_allowed("k", 10, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_millis(500)).await;
        limiter.is_allowed("k", 10, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_millis(600)).await;
        limiter.is_allowed("k", 10, Duration::from_secs(10));

        let buckets = limiter.windows.get("k").unwrap().buckets.clone();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = SlidingWindowRateLimiter::new(2);
        let window = Duration::from_secs(10);

        assert!(limiter.is_allowed("k", 2, window));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(limiter.is_allowed("k", 2, window));
        assert!(!limiter.is_allowed("k", 2, window));

        // first unit leaves the window, second is still in
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(limiter.is_allowed("k", 2, window));
        assert!(!limiter.is_allowed("k", 2, window));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_does_not_consume() {
        let limiter = SlidingWindowRateLimiter::new(1);

        assert!(limiter.is_allowed("k", 1, WINDOW));
        for _ in 0..5 {
            assert!(!limiter.is_allowed("k", 1, WINDOW));
        }

        let window = limiter.windows.get("k").unwrap();
        assert_eq!(window.buckets.iter().map(|b| b.count).sum::<u32>(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let limiter = SlidingWindowRateLimiter::new(1);

        assert!(limiter.is_allowed("a", 1, WINDOW));
        assert!(limiter.is_allowed("b", 1, WINDOW));
        assert!(!limiter.is_allowed("a", 1, WINDOW));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_returns_unit() {
        let limiter = SlidingWindowRateLimiter::new(1);

        let ticket = limiter.check("k", 1, WINDOW).ticket.unwrap();
        assert!(!limiter.is_allowed("k", 1, WINDOW));

        limiter.release("k", ticket);
        assert!(limiter.is_allowed("k", 1, WINDOW));

        limiter.release("missing", ticket);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_check_has_no_ticket() {
        let limiter = SlidingWindowRateLimiter::new(1);

        assert!(limiter.check("k", 1, WINDOW).ticket.is_some());
        assert!(limiter.check("k", 1, WINDOW).ticket.is_none());
        assert!(limiter.check("z", 0, WINDOW).ticket.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_only_touches_own_bucket() {
        let window = Duration::from_secs(10);
        let limiter = SlidingWindowRateLimiter::new(2);

        let first = limiter.check("k", 2, window).ticket.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(limiter.is_allowed("k", 2, window));

        limiter.release("k", first);

        let buckets = limiter.windows.get("k").unwrap().buckets.clone();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 1);
        assert_eq!(limiter.get_remaining_requests("k"), 1);

        // the same ticket cannot free the later unit
        limiter.release("k", first);
        assert_eq!(limiter.get_remaining_requests("k"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_after_window_is_ignored() {
        let limiter = SlidingWindowRateLimiter::new(1);

        let stale = limiter.check("k", 1, WINDOW).ticket.unwrap();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(limiter.is_allowed("k", 1, WINDOW));

        limiter.release("k", stale);

        assert!(!limiter.is_allowed("k", 1, WINDOW));
        assert_eq!(limiter.get_remaining_requests("k"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_within_coalesced_bucket() {
        let limiter = SlidingWindowRateLimiter::new(3);

        let a = limiter.check("k", 3, WINDOW).ticket.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        let b = limiter.check("k", 3, WINDOW).ticket.unwrap();
        assert_eq!(a, b);

        limiter.release("k", b);
        assert_eq!(limiter.get_remaining_requests("k"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_rejects_without_state() {
        let limiter = SlidingWindowRateLimiter::new(0);

        assert!(!limiter.is_allowed("k", 0, WINDOW));
        assert_eq!(limiter.key_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_idle_keys() {
        let limiter = SlidingWindowRateLimiter::new(5);

        limiter.is_allowed("old", 5, WINDOW);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        limiter.is_allowed("fresh", 5, WINDOW);

        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.key_count(), 1);
        assert_eq!(limiter.get_remaining_requests("fresh"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeper_and_destroy() {
        let limiter = SlidingWindowRateLimiter::new(5);
        limiter.start_sweeper(Duration::from_secs(2));

        limiter.is_allowed("k", 5, WINDOW);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(limiter.key_count(), 0);

        limiter.is_allowed("k", 5, WINDOW);
        limiter.destroy();
        assert_eq!(limiter.key_count(), 0);
        assert!(limiter.sweeper.lock().unwrap().is_none());
    }
}
