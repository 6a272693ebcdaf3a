use rand::Rng;
use std::time::Duration;

/// Floor for `base`; a zero base would never grow and reconnect in a hot loop
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Exponential reconnect delay
///
/// Starts at `base`, doubles after every failed attempt and is clamped at
/// `cap`. A successful connect resets it to `base`. Optional jitter adds a
/// random `0..=jitter` on top of each delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    base: Duration,
    cap: Duration,
    jitter: Duration,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        let base = base.max(MIN_DELAY);
        let cap = cap.max(base);
        Self {
            current: base,
            base,
            cap,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait before the next attempt; advances the schedule
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.cap);

        if self.jitter.is_zero() {
            delay
        } else {
            let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
            delay + Duration::from_millis(extra)
        }
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }

    pub const fn current(&self) -> Duration {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_reset_returns_to_base() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(100));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_millis(40));
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(100))
            .with_jitter(Duration::from_millis(50));
        for _ in 0..100 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_cap_below_base_is_raised() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_base_still_waits_and_grows() {
        let mut backoff = Backoff::new(Duration::ZERO, Duration::from_millis(8));
        let delays: Vec<u128> = (0..5).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8]);
        backoff.reset();
        assert!(!backoff.current().is_zero());
    }
}
