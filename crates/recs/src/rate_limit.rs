//! Rate limiting for metadata provider calls.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The provider's published budget: 40 requests per 10 seconds.
const PROVIDER_MAX_REQUESTS: u32 = 40;
const PROVIDER_WINDOW: Duration = Duration::from_secs(10);

/// Direct (un-keyed) rate limiter guarding outbound provider calls.
pub struct ProviderRateLimiter {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl ProviderRateLimiter {
    /// Limiter allowing `max_requests` per `window`, replenished evenly
    /// across the window with the full budget available as burst.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max_requests).unwrap_or(nonzero!(1u32));
        let quota = Quota::with_period(window / burst.get())
            .unwrap_or_else(|| Quota::per_second(nonzero!(1u32)))
            .allow_burst(burst);

        debug!(
            max_requests,
            window_secs = window.as_secs(),
            "provider rate limiter configured"
        );

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until a call slot is available. Jitter avoids thundering herds
    /// when many fetches queue up behind the same window.
    pub async fn acquire(&self) {
        self.limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;
    }
}

impl Default for ProviderRateLimiter {
    fn default() -> Self {
        Self::new(PROVIDER_MAX_REQUESTS, PROVIDER_WINDOW)
    }
}
