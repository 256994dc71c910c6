// Minimum-interval rate limiter for the Natural Language API.
//
// The API enforces a per-minute request quota per project. Spacing requests
// evenly keeps a batch of topic extractions under it without needing to
// handle 429s: each call waits until `interval` has passed since the last
// one was let through.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Pacing>>,
}

struct Pacing {
    interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Allow at most `requests_per_second` requests per second.
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Pacing {
                interval: Duration::from_secs_f64(1.0 / requests_per_second),
                last_request: None,
            })),
        }
    }

    /// Wait for the next request slot.
    pub async fn acquire(&self) {
        let mut pacing = self.inner.lock().await;

        if let Some(last) = pacing.last_request {
            let elapsed = last.elapsed();
            if elapsed < pacing.interval {
                // Holding the lock while sleeping queues callers in order
                tokio::time::sleep(pacing.interval - elapsed).await;
            }
        }

        pacing.last_request = Some(Instant::now());
    }
}
