use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Call quota for one pipeline stage method: `max_calls` per rolling
/// `window`, shared across every repository that stage touches in a run.
///
/// `acquire` never fails; a caller over budget is suspended until the
/// window rolls over. Nothing is persisted between runs.
#[derive(Debug)]
pub struct RateBudget {
    max_calls: u32,
    window: Duration,
    window_start: Instant,
    used: u32,
}

impl RateBudget {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        RateBudget {
            max_calls,
            window,
            window_start: Instant::now(),
            used: 0,
        }
    }

    /// Default quota: 30 calls per 30 seconds.
    pub fn standard() -> Self {
        RateBudget::new(30, Duration::from_secs(30))
    }

    /// Take one call from the budget, suspending until one is available.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            if now.duration_since(self.window_start) >= self.window {
                self.window_start = now;
                self.used = 0;
            }

            if self.used < self.max_calls {
                self.used += 1;
                return;
            }

            let window_end = self.window_start + self.window;
            debug!(
                wait_ms = window_end.duration_since(now).as_millis() as u64,
                "rate budget exhausted, waiting for next window"
            );
            sleep_until(window_end).await;
        }
    }
}
