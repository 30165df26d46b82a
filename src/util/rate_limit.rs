//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default inbound message cap per connection (paddle updates are frequent)
pub const DEFAULT_MESSAGES_PER_SECOND: u32 = 60;

/// Create a rate limiter with the specified requests per second.
///
/// The whole per-second budget is available as a burst and refills over one
/// second, so a client may send `requests_per_second` frames back to back.
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Per-connection message rate limiting settings
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Max inbound messages per connection per second (0 = disabled)
    pub messages_per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            messages_per_second: DEFAULT_MESSAGES_PER_SECOND,
        }
    }
}

/// Per-connection rate limiter state
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    limiter: Option<Arc<Limiter>>,
}

impl ConnectionRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let limiter = (config.messages_per_second > 0)
            .then(|| create_limiter(config.messages_per_second));
        Self { limiter }
    }

    /// Check if an inbound message is allowed (returns true if allowed)
    pub fn check_message(&self) -> bool {
        self.limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_full_budget_then_rejects() {
        let limiter = ConnectionRateLimiter::new(RateLimitConfig {
            messages_per_second: 5,
        });

        for _ in 0..5 {
            assert!(limiter.check_message());
        }
        assert!(!limiter.check_message());
    }

    #[test]
    fn zero_disables_limiting() {
        let limiter = ConnectionRateLimiter::new(RateLimitConfig {
            messages_per_second: 0,
        });
        for _ in 0..1000 {
            assert!(limiter.check_message());
        }
    }

    #[test]
    fn clones_share_budget() {
        let limiter = ConnectionRateLimiter::new(RateLimitConfig {
            messages_per_second: 2,
        });
        let other = limiter.clone();
        assert!(limiter.check_message());
        assert!(other.check_message());
        assert!(!limiter.check_message());
    }
}
