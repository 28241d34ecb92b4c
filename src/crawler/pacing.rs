//! Politeness delays between page requests

use super::retry::uniform_between;
use crate::config::PolitenessConfig;
use std::time::Duration;

/// Shortest delay ever allowed between consecutive requests
pub const MIN_DELAY_FLOOR: Duration = Duration::from_millis(200);

/// Mandatory randomised delay between consecutive page requests
///
/// Every listing iteration and every detail fetch after the first waits a
/// random duration within `[min, max]`. Neither bound can go below
/// [`MIN_DELAY_FLOOR`].
#[derive(Debug, Clone)]
pub struct Pacer {
    min: Duration,
    max: Duration,
}

impl Pacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        let min = if min < MIN_DELAY_FLOOR {
            tracing::warn!(
                "Politeness delay {:?} is below the {:?} floor; using the floor",
                min,
                MIN_DELAY_FLOOR
            );
            MIN_DELAY_FLOOR
        } else {
            min
        };

        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn from_config(config: &PolitenessConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }

    /// Sleeps for a random delay and returns how long it slept
    pub async fn pause(&self) -> Duration {
        let delay = uniform_between(self.min, self.max);
        tracing::trace!("Pausing {:?}", delay);
        tokio::time::sleep(delay).await;
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_is_enforced() {
        let pacer = Pacer::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(pacer.bounds(), (MIN_DELAY_FLOOR, MIN_DELAY_FLOOR));
    }

    #[test]
    fn test_max_never_below_min() {
        let pacer = Pacer::new(Duration::from_millis(500), Duration::from_millis(100));
        assert_eq!(
            pacer.bounds(),
            (Duration::from_millis(500), Duration::from_millis(500))
        );
    }

    #[test]
    fn test_from_config() {
        let pacer = Pacer::from_config(&PolitenessConfig {
            min_delay_ms: 2_000,
            max_delay_ms: 5_000,
        });
        assert_eq!(
            pacer.bounds(),
            (Duration::from_secs(2), Duration::from_secs(5))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_within_bounds() {
        let pacer = Pacer::new(Duration::from_millis(300), Duration::from_millis(600));
        for _ in 0..10 {
            let started = tokio::time::Instant::now();
            let slept = pacer.pause().await;
            assert!(slept >= Duration::from_millis(300) && slept <= Duration::from_millis(600));
            assert!(started.elapsed() >= slept);
        }
    }
}
