use std::time::Duration;

/// Exponential backoff schedule for delivery retries.
///
/// The delay before retry `i` (0-based) is `base * 2^i`. With the default
/// base of 30s and 5 attempts the schedule is 30, 60, 120, 240, 480 seconds.
#[derive(Clone, Debug)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        let delays = (0..max_attempts)
            .map(|i| {
                let factor = 2u32.saturating_pow(i);
                base.saturating_mul(factor)
            })
            .collect();
        Self { delays }
    }

    /// Delay for the given 0-based retry index, or `None` past the schedule.
    pub fn delay(&self, index: usize) -> Option<Duration> {
        self.delays.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    pub fn as_slice(&self) -> &[Duration] {
        &self.delays
    }
}
