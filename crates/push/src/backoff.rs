//! Retry pacing for the push channel.
//!
//! Reconnection itself is unconditional and only ever stopped by the
//! shutdown token; the only policy here is how long to wait between
//! attempts during one outage.

use std::time::Duration;

/// Doubling delay schedule with a fixed cap.
///
/// Stateful: each [`next_delay`](Self::next_delay) advances the
/// schedule, and [`reset`](Self::reset) starts a fresh one once a
/// connection is established again.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    cap: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            initial,
            cap,
            current: None,
        }
    }

    /// The delay to wait before the next attempt: the initial delay on
    /// the first call of an outage, then doubling up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.initial.min(self.cap),
            Some(prev) => self.cap.min(prev.saturating_mul(2)),
        };
        self.current = Some(delay);
        delay
    }

    /// Forget the current outage; the next failure starts over at the
    /// initial delay.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut Backoff, n: usize) -> Vec<u64> {
        (0..n).map(|_| backoff.next_delay().as_secs()).collect()
    }

    #[test]
    fn schedule_doubles_up_to_the_cap() {
        let mut backoff = Backoff::default();
        assert_eq!(secs(&mut backoff, 8), vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn reset_starts_the_schedule_over() {
        let mut backoff = Backoff::default();
        secs(&mut backoff, 4);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn cap_applies_mid_schedule() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(secs(&mut backoff, 6), vec![1, 2, 4, 8, 10, 10]);
    }

    #[test]
    fn initial_delay_is_clamped_to_the_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(30));
        assert_eq!(backoff.next_delay(), Duration::from_secs(30));
    }
}
