use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range of sample indices on the input timeline.
///
/// All interval arithmetic happens in samples; seconds only appear once records leave the
/// aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeechInterval {
    pub start: usize,
    pub end: usize,
}

impl SpeechInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of samples covered by the interval.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Start offset in seconds at `sample_rate_hz`.
    pub fn start_seconds(&self, sample_rate_hz: u32) -> f64 {
        samples_to_seconds(self.start, sample_rate_hz)
    }

    /// End offset in seconds at `sample_rate_hz`.
    pub fn end_seconds(&self, sample_rate_hz: u32) -> f64 {
        samples_to_seconds(self.end, sample_rate_hz)
    }
}

/// Whether `intervals` is sorted by start, non-empty per element, and mutually non-overlapping.
pub fn is_well_formed(intervals: &[SpeechInterval]) -> bool {
    intervals.iter().all(|iv| !iv.is_empty())
        && intervals.windows(2).all(|w| w[0].end <= w[1].start)
}

/// Convert a sample count into seconds.
pub fn samples_to_seconds(samples: usize, sample_rate_hz: u32) -> f64 {
    samples as f64 / sample_rate_hz as f64
}

/// Convert milliseconds → number of samples at `sample_rate_hz`.
///
/// We round to the nearest sample so durations are stable across rates.
pub fn ms_to_samples(ms: u32, sample_rate_hz: u32) -> usize {
    ((ms as f64 / 1000.0) * sample_rate_hz as f64).round() as usize
}

/// Convert seconds → number of samples at `sample_rate_hz`, rounding to the nearest sample.
///
/// Negative or non-finite inputs map to zero.
pub fn seconds_to_samples(seconds: f64, sample_rate_hz: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate_hz as f64).round() as usize
}
