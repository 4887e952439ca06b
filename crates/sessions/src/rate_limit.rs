//! Sliding-window admission control, per connection.
//!
//! Purely in-memory, no cross-connection coupling — one [`RateLimiter`]
//! is created per WebSocket connection by [`crate::SessionStore::create_rate_limiter`]
//! and owned exclusively by that connection's task.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Admits at most `limit` calls to [`RateLimiter::allow`] per rolling 60s
/// window.
pub struct RateLimiter {
    limit: u32,
    admitted: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            admitted: VecDeque::new(),
        }
    }

    /// Returns `true` and records the admission if under the rolling-window
    /// cap; otherwise returns `false` and leaves state untouched save for
    /// dropping entries that have aged out.
    pub fn allow(&mut self, now: Instant) -> bool {
        while let Some(&front) = self.admitted.front() {
            if now.duration_since(front) > WINDOW {
                self.admitted.pop_front();
            } else {
                break;
            }
        }

        if self.admitted.len() as u32 >= self.limit {
            return false;
        }

        self.admitted.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit() {
        let mut rl = RateLimiter::new(3);
        let now = Instant::now();
        assert!(rl.allow(now));
        assert!(rl.allow(now));
        assert!(rl.allow(now));
        assert!(!rl.allow(now));
    }

    #[test]
    fn window_slides_after_60s() {
        let mut rl = RateLimiter::new(1);
        let t0 = Instant::now();
        assert!(rl.allow(t0));
        assert!(!rl.allow(t0 + Duration::from_secs(30)));
        assert!(rl.allow(t0 + Duration::from_secs(61)));
    }

    #[test]
    fn zero_limit_never_admits() {
        let mut rl = RateLimiter::new(0);
        assert!(!rl.allow(Instant::now()));
    }
}
