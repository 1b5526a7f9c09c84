//! Spinner - animation frames and the timer that advances them

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};

/// A looping animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spinner {
    frames: &'static [&'static str],
    interval: Duration,
}

/// Braille dot spinner, ten frames per second
pub const DOT: Spinner = Spinner {
    frames: &["⣾ ", "⣽ ", "⣻ ", "⢿ ", "⡿ ", "⣟ ", "⣯ ", "⣷ "],
    interval: Duration::from_millis(100),
};

impl Spinner {
    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Frame text for an animation phase
    pub fn frame(&self, phase: usize) -> &'static str {
        if self.frames.is_empty() {
            return "";
        }
        self.frames[phase % self.frames.len()]
    }

    /// Phase after one tick
    pub fn step(&self, phase: usize) -> usize {
        if self.frames.is_empty() {
            return 0;
        }
        (phase + 1) % self.frames.len()
    }

    /// Timer that drives this spinner; late ticks are not bunched up
    pub fn ticker(&self) -> Interval {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

impl Default for Spinner {
    fn default() -> Self {
        DOT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_wraps() {
        let spinner = DOT;
        let mut phase = 0;
        for _ in 0..spinner.frames.len() {
            phase = spinner.step(phase);
        }
        assert_eq!(phase, 0);
        assert_eq!(spinner.frame(1), "⣽ ");
        assert_eq!(spinner.frame(spinner.frames.len() + 1), "⣽ ");
    }

    #[test]
    fn test_with_interval() {
        let spinner = DOT.with_interval(Duration::from_millis(250));
        assert_eq!(spinner.interval, Duration::from_millis(250));
        assert_eq!(spinner.frames, DOT.frames);
    }
}
