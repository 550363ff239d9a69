//! Random response jitter against timing side channels.

use std::time::Duration;

use rand::Rng;

/// Uniform delay in `[min, max]`, applied before every booking is handled.
#[derive(Debug, Clone, Copy)]
pub struct ResponseJitter {
    min: Duration,
    max: Duration,
}

impl ResponseJitter {
    /// Bounds are reordered if given backwards.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    /// No delay at all (tests, local development).
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let lo = self.min.as_micros() as u64;
        let hi = self.max.as_micros() as u64;
        Duration::from_micros(rand::rng().random_range(lo..=hi))
    }

    /// Sleeps for a sampled duration. Returns the time waited.
    pub async fn wait(&self) -> Duration {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        delay
    }
}
