//! Tick-based debouncing of polled inputs

/// Turns a noisy polled level into a single press event
///
/// Counts consecutive identical samples; any change restarts the count.
/// A press is reported exactly once, on the sample where a `true` level has
/// been seen `threshold` times in a row. Holding the button does not repeat
/// the event.
#[derive(Debug, Clone)]
pub struct InputDebouncer {
    threshold: u32,
    last: Option<bool>,
    run_length: u32,
}

impl InputDebouncer {
    /// `threshold` is clamped to at least one sample
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            last: None,
            run_length: 0,
        }
    }

    /// Feed one sample; returns `true` on a confirmed press
    pub fn sample(&mut self, level: bool) -> bool {
        if self.last == Some(level) {
            self.run_length = self.run_length.saturating_add(1);
        } else {
            self.last = Some(level);
            self.run_length = 1;
        }

        level && self.run_length == self.threshold
    }

    /// Last sampled level, if any
    pub fn level(&self) -> Option<bool> {
        self.last
    }
}
