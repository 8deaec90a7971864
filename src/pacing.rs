use std::time::Duration;
use tokio::time::Instant;

/// Paces calls to the analysis API.
///
/// Replaces the inline sleep between batch items with an explicit
/// abstraction the sync loop does not own: the first call never waits, and
/// each subsequent call waits until `interval` has elapsed since the
/// previous one. Processing K records therefore incurs exactly K-1 delay
/// units, applied between records rather than before or after the batch.
///
/// Testable without real time under `tokio::time::pause` (the sleeps are
/// tokio sleeps).
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    last_pass: Option<Instant>,
    delays_applied: u64,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_pass: None,
            delays_applied: 0,
        }
    }

    /// Waits until the pacing interval since the previous call has elapsed.
    /// No-op on the first call.
    pub async fn pace(&mut self) {
        if let Some(last) = self.last_pass {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
                self.delays_applied += 1;
            }
        }
        self.last_pass = Some(Instant::now());
    }

    /// Number of inter-record delays applied so far.
    pub fn delays_applied(&self) -> u64 {
        self.delays_applied
    }
}
