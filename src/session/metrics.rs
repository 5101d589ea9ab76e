use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Elapsed-time floor (six seconds) so speed doesn't explode right after start.
pub const MIN_ELAPSED_MINUTES: f64 = 0.1;
pub const CHARS_PER_WORD: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub wpm: u32,
    /// Raw accuracy percentage. Goes negative when errors outnumber progress.
    pub accuracy: i32,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
        }
    }
}

impl Metrics {
    pub fn compute(correct_chars: usize, errors: usize, elapsed: Duration) -> Self {
        Self {
            wpm: wpm(correct_chars, elapsed),
            accuracy: accuracy(correct_chars, errors),
        }
    }

    /// Accuracy clamped for display.
    pub fn display_accuracy(&self) -> u32 {
        self.accuracy.clamp(0, 100) as u32
    }
}

pub fn elapsed_minutes(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() / 60.0).max(MIN_ELAPSED_MINUTES)
}

pub fn wpm(correct_chars: usize, elapsed: Duration) -> u32 {
    let words = correct_chars as f64 / CHARS_PER_WORD;
    round_half_up(words / elapsed_minutes(elapsed)).max(0.0) as u32
}

pub fn accuracy(correct_chars: usize, errors: usize) -> i32 {
    let progressed = correct_chars as f64;
    let ratio = (progressed - errors as f64) / progressed.max(1.0);
    round_half_up(ratio * 100.0) as i32
}

// Halves round toward positive infinity, so -2.5 becomes -2.
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_floor_applies_early() {
        assert_eq!(elapsed_minutes(Duration::from_secs(0)), MIN_ELAPSED_MINUTES);
        assert_eq!(elapsed_minutes(Duration::from_secs(3)), MIN_ELAPSED_MINUTES);
        assert!((elapsed_minutes(Duration::from_secs(30)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_wpm_uses_five_char_words() {
        // 50 chars in one minute = 10 words per minute
        assert_eq!(wpm(50, Duration::from_secs(60)), 10);
        // 10 chars within the floor: 2 words / 0.1 min
        assert_eq!(wpm(10, Duration::from_secs(1)), 20);
        assert_eq!(wpm(0, Duration::from_secs(60)), 0);
    }

    #[test]
    fn test_wpm_rounds() {
        // 13 chars in one minute = 2.6 words
        assert_eq!(wpm(13, Duration::from_secs(60)), 3);
        // 12 chars = 2.4 words
        assert_eq!(wpm(12, Duration::from_secs(60)), 2);
    }

    #[test]
    fn test_accuracy_formula() {
        assert_eq!(accuracy(0, 0), 0);
        assert_eq!(accuracy(10, 0), 100);
        assert_eq!(accuracy(10, 1), 90);
        assert_eq!(accuracy(3, 1), 67);
    }

    #[test]
    fn test_accuracy_is_not_clamped() {
        assert_eq!(accuracy(2, 5), -150);
        assert_eq!(accuracy(0, 3), -300);
        let metrics = Metrics::compute(2, 5, Duration::from_secs(60));
        assert_eq!(metrics.accuracy, -150);
        assert_eq!(metrics.display_accuracy(), 0);
    }

    #[test]
    fn test_accuracy_half_rounds_up() {
        // 7 of 8 = 87.5
        assert_eq!(accuracy(8, 1), 88);
    }

    #[test]
    fn test_default_metrics() {
        let metrics = Metrics::default();
        assert_eq!(metrics.wpm, 0);
        assert_eq!(metrics.accuracy, 100);
    }
}
