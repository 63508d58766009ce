//! Round-trip time averaging.

use std::time::Duration;

/// Weight of the newest sample in the moving average.
const RTT_ALPHA: f64 = 0.2;

/// Exponentially weighted moving average of probe round trips.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RttTracker {
    average: Option<Duration>,
}

impl RttTracker {
    /// Fold in a sample and return the new average.
    pub(crate) fn add(&mut self, sample: Duration) -> Duration {
        let next = match self.average {
            None => sample,
            Some(avg) => sample.mul_f64(RTT_ALPHA) + avg.mul_f64(1.0 - RTT_ALPHA),
        };
        self.average = Some(next);
        next
    }

    pub(crate) const fn average(&self) -> Option<Duration> {
        self.average
    }
}
