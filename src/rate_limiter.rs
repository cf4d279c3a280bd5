//! Sliding-window request throttle
//!
//! Admits up to `max_requests` requests in any trailing `window`. Bursts are
//! allowed up to the limit; after that each caller waits until the oldest
//! request in the window expires, plus a small safety margin.

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    margin: Duration,
    /// Request instants inside the trailing window, oldest first
    log: VecDeque<Instant>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests: config.max_requests.max(1),
            window: config.window,
            margin: config.margin,
            log: VecDeque::new(),
            clock,
        }
    }

    /// Block until one more request fits in the window, then record it.
    pub fn acquire(&mut self) {
        loop {
            let now = self.clock.now();
            self.prune(now);

            if self.log.len() < self.max_requests {
                self.log.push_back(now);
                return;
            }

            let wait = match self.log.front() {
                Some(oldest) => {
                    self.window.saturating_sub(now.duration_since(*oldest)) + self.margin
                }
                None => self.margin,
            };
            log::debug!(
                "Rate limit reached ({} requests / {:?}), waiting {:.1}s",
                self.max_requests,
                self.window,
                wait.as_secs_f64()
            );
            self.clock.sleep(wait);
        }
    }

    /// Number of requests currently counted against the window
    pub fn in_window(&self) -> usize {
        self.log.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.log.front() {
            if now.duration_since(*oldest) >= self.window {
                self.log.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(max: usize, window_secs: u64, clock: Arc<ManualClock>) -> RateLimiter {
        let config = RateLimitConfig {
            max_requests: max,
            window: Duration::from_secs(window_secs),
            margin: Duration::from_millis(500),
        };
        RateLimiter::new(&config, clock)
    }

    #[test]
    fn test_burst_up_to_limit_does_not_wait() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = limiter(10, 10, clock.clone());

        for _ in 0..10 {
            limiter.acquire();
        }

        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.in_window(), 10);
    }

    #[test]
    fn test_eleventh_request_waits_for_window() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = limiter(10, 10, clock.clone());

        for _ in 0..10 {
            limiter.acquire();
            clock.advance(Duration::from_millis(10));
        }
        let elapsed_before = clock.elapsed();

        limiter.acquire();

        let waited = clock.elapsed() - elapsed_before;
        // Window minus time already spent since the first request, plus margin
        assert!(waited >= Duration::from_secs(10) - elapsed_before);
        assert_eq!(
            waited,
            Duration::from_secs(10) - elapsed_before + Duration::from_millis(500)
        );
        assert_eq!(clock.sleeps().len(), 1);
    }

    #[test]
    fn test_window_slides() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = limiter(2, 10, clock.clone());

        limiter.acquire();
        clock.advance(Duration::from_secs(6));
        limiter.acquire();
        clock.advance(Duration::from_secs(5));

        // First request is now 11s old and has left the window
        limiter.acquire();

        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.in_window(), 2);
    }

    #[test]
    fn test_sustained_load_is_throttled() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = limiter(3, 1, clock.clone());

        for _ in 0..9 {
            limiter.acquire();
        }

        // 9 requests at 3/s need at least two full windows
        assert!(clock.elapsed() >= Duration::from_secs(2));
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn test_zero_limit_is_treated_as_one() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = limiter(0, 1, clock.clone());

        limiter.acquire();
        limiter.acquire();

        assert_eq!(clock.sleeps().len(), 1);
    }

    #[test]
    fn test_huge_limit_does_not_preallocate() {
        let clock = Arc::new(ManualClock::new());
        let mut limiter = limiter(usize::MAX, 10, clock.clone());

        for _ in 0..100 {
            limiter.acquire();
        }

        assert!(clock.sleeps().is_empty());
        assert_eq!(limiter.in_window(), 100);
    }
}
