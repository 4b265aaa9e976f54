use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Minimum spacing between the start of one client call and the start of
/// the next.
pub const DEFAULT_FLOOR: Duration = Duration::from_millis(50);

/// Paces consecutive calls by padding fast ones.
///
/// The wrapped call runs immediately; if it completes in under the floor,
/// the caller is held for the remainder before the value is returned. A
/// call that is naturally slower than the floor costs nothing extra. This
/// is not a token bucket: no burst allowance, no cross-process state.
#[derive(Debug, Clone)]
pub struct Throttle {
    floor: Duration,
}

impl Throttle {
    pub fn new(floor: Duration) -> Self {
        Self { floor }
    }

    pub async fn pace<F>(&self, call: F) -> F::Output
    where
        F: Future,
    {
        let started = Instant::now();
        let value = call.await;
        let elapsed = started.elapsed();
        if elapsed < self.floor {
            tokio::time::sleep(self.floor - elapsed).await;
        }
        value
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_FLOOR)
    }
}
