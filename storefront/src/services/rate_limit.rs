// storefront/src/services/rate_limit.rs

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
  Allowed { remaining: usize },
  Limited { retry_after_secs: u64 },
}

/// Counts requests per key over a rolling window.
pub trait RateLimiter: Send + Sync {
  /// Records a request for `key` at `now` if it fits in the window.
  fn hit_at(&self, key: &str, now: DateTime<Utc>) -> RateDecision;
}

/// Process-local sliding-window limiter.
pub struct InMemoryRateLimiter {
  max_requests: usize,
  window: Duration,
  hits: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl InMemoryRateLimiter {
  pub fn new(max_requests: usize, window: Duration) -> Self {
    Self {
      max_requests,
      window,
      hits: Mutex::new(HashMap::new()),
    }
  }
}

impl RateLimiter for InMemoryRateLimiter {
  fn hit_at(&self, key: &str, now: DateTime<Utc>) -> RateDecision {
    let mut hits = self.hits.lock();
    let window_start = now - self.window;

    // Drop keys whose whole history has rolled out of the window.
    hits.retain(|_, times| times.back().is_some_and(|t| *t > window_start));

    let times = hits.entry(key.to_string()).or_default();
    while times.front().is_some_and(|t| *t <= window_start) {
      times.pop_front();
    }

    if times.len() >= self.max_requests {
      let oldest = times.front().copied().unwrap_or(now);
      let retry_after = (oldest + self.window - now).num_seconds().max(1);
      return RateDecision::Limited {
        retry_after_secs: retry_after as u64,
      };
    }

    times.push_back(now);
    RateDecision::Allowed {
      remaining: self.max_requests - times.len(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blocks_after_limit_until_window_rolls() {
    let limiter = InMemoryRateLimiter::new(3, Duration::minutes(10));
    let start = Utc::now();

    for i in 0..3 {
      assert!(matches!(
        limiter.hit_at("9876543210", start + Duration::seconds(i)),
        RateDecision::Allowed { .. }
      ));
    }
    assert_eq!(
      limiter.hit_at("9876543210", start + Duration::minutes(1)),
      RateDecision::Limited { retry_after_secs: 540 }
    );

    let after_window = start + Duration::minutes(10) + Duration::seconds(1);
    assert!(matches!(
      limiter.hit_at("9876543210", after_window),
      RateDecision::Allowed { .. }
    ));
  }

  #[test]
  fn keys_are_independent() {
    let limiter = InMemoryRateLimiter::new(1, Duration::minutes(10));
    let now = Utc::now();

    assert!(matches!(limiter.hit_at("a", now), RateDecision::Allowed { remaining: 0 }));
    assert!(matches!(limiter.hit_at("a", now), RateDecision::Limited { .. }));
    assert!(matches!(limiter.hit_at("b", now), RateDecision::Allowed { .. }));
  }
}
