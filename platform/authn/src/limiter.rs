//! Fixed-window throttling for anonymous visitors.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

/// 10 requests per rolling hour, matching the public lookup quota.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Error)]
#[error("rate limit exceeded: visitors may make {limit} requests per {} seconds", window.as_secs())]
pub struct RateExceeded {
    pub limit: usize,
    pub window: Duration,
}

/// Per-address request-timestamp table, the only mutable shared state in the
/// access core. Constructed once at process start and injected.
///
/// Timestamps older than the window are pruned lazily on each check; prune,
/// check and append happen as one unit under the lock so a concurrent burst
/// from one address cannot sneak past the threshold. There is no background
/// sweep and no ordering guarantee between different addresses.
#[derive(Debug)]
pub struct VisitorLimiter {
    window: Duration,
    limit: usize,
    hits: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl Default for VisitorLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_LIMIT)
    }
}

impl VisitorLimiter {
    pub fn new(window: Duration, limit: usize) -> Self {
        Self {
            window,
            limit,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Count one anonymous request from `addr`, or refuse it.
    pub fn check(&self, addr: IpAddr) -> Result<(), RateExceeded> {
        self.check_at(addr, Instant::now())
    }

    fn check_at(&self, addr: IpAddr, now: Instant) -> Result<(), RateExceeded> {
        let mut hits = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = hits.entry(addr).or_default();
        entry.retain(|seen| now.duration_since(*seen) < self.window);
        if entry.len() >= self.limit {
            return Err(RateExceeded {
                limit: self.limit,
                window: self.window,
            });
        }
        entry.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> IpAddr {
        IpAddr::from([203, 0, 113, last])
    }

    #[test]
    fn eleventh_request_in_the_window_is_throttled() {
        let limiter = VisitorLimiter::default();
        let start = Instant::now();
        for i in 0..10 {
            limiter
                .check_at(addr(1), start + Duration::from_secs(i * 60))
                .expect("within quota");
        }
        assert!(limiter.check_at(addr(1), start + Duration::from_secs(600)).is_err());
    }

    #[test]
    fn quota_recovers_after_the_window_elapses() {
        let limiter = VisitorLimiter::default();
        let start = Instant::now();
        for _ in 0..10 {
            limiter.check_at(addr(2), start).expect("within quota");
        }
        assert!(limiter.check_at(addr(2), start).is_err());
        let later = start + DEFAULT_WINDOW + Duration::from_secs(1);
        assert!(limiter.check_at(addr(2), later).is_ok());
    }

    #[test]
    fn addresses_are_throttled_independently() {
        let limiter = VisitorLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();
        assert!(limiter.check_at(addr(3), now).is_ok());
        assert!(limiter.check_at(addr(3), now).is_err());
        assert!(limiter.check_at(addr(4), now).is_ok());
    }

    #[test]
    fn stale_timestamps_are_pruned_not_counted() {
        let limiter = VisitorLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();
        assert!(limiter.check_at(addr(5), start).is_ok());
        assert!(limiter.check_at(addr(5), start + Duration::from_secs(61)).is_ok());
        // The first hit has aged out, so a third check still fits.
        assert!(limiter.check_at(addr(5), start + Duration::from_secs(62)).is_ok());
        assert!(limiter.check_at(addr(5), start + Duration::from_secs(63)).is_err());
    }
}
