//! Hysteresis segmentation of a speech-probability trace into raw speech intervals.
//!
//! The scan is a single left-to-right fold over the trace. Speech starts when a window reaches
//! `threshold`; it only ends after the probability has dropped below
//! `threshold - neg_threshold_offset` and stayed out of the speech band for at least
//! `min_silence_samples`. A window back at or above `threshold` cancels a pending end.

use tracing::debug;

use crate::interval::SpeechInterval;
use crate::{Error, Result};

use super::trace::ProbabilityTrace;

/// Segmenter parameters, all in samples except the probability thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmenterParams {
    pub window_size: usize,
    pub threshold: f32,
    pub neg_threshold_offset: f32,
    pub min_speech_samples: usize,
    pub min_silence_samples: usize,
}

impl SegmenterParams {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::config("window size must be greater than zero"));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 || self.threshold >= 1.0 {
            return Err(Error::config(format!(
                "threshold must be in (0, 1), got {}",
                self.threshold
            )));
        }
        if !self.neg_threshold_offset.is_finite() || self.neg_threshold_offset <= 0.0 {
            return Err(Error::config(format!(
                "negative threshold offset must be positive, got {}",
                self.neg_threshold_offset
            )));
        }
        if self.neg_threshold() <= 0.0 {
            return Err(Error::config(format!(
                "negative threshold must stay positive: {} - {} <= 0",
                self.threshold, self.neg_threshold_offset
            )));
        }
        Ok(())
    }

    /// Probability below which a window counts as silence.
    pub fn neg_threshold(&self) -> f32 {
        self.threshold - self.neg_threshold_offset
    }
}

/// Scan state carried from one window to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    Triggered {
        start: usize,
        pending_end: Option<usize>,
    },
}

/// Apply the hysteresis state machine to `trace`.
///
/// Every returned interval is longer than `min_speech_samples`; intervals are sorted and
/// non-overlapping. A run still open at the end of the trace is closed at
/// `trace.total_samples()`.
pub fn segment(trace: &ProbabilityTrace, params: &SegmenterParams) -> Result<Vec<SpeechInterval>> {
    params.validate()?;
    if trace.window_size() != params.window_size {
        return Err(Error::config(format!(
            "trace window size {} does not match segmenter window size {}",
            trace.window_size(),
            params.window_size
        )));
    }

    let mut intervals = Vec::new();
    let state = trace
        .probs()
        .iter()
        .enumerate()
        .fold(ScanState::Idle, |state, (i, &prob)| {
            step(state, prob, params.window_size * i, params, &mut intervals)
        });

    if let ScanState::Triggered { start, .. } = state {
        let total = trace.total_samples();
        if total.saturating_sub(start) > params.min_speech_samples {
            intervals.push(SpeechInterval::new(start, total));
        }
    }

    debug!(
        windows = trace.probs().len(),
        intervals = intervals.len(),
        "segmented speech probability trace"
    );

    Ok(intervals)
}

fn step(
    state: ScanState,
    prob: f32,
    offset: usize,
    params: &SegmenterParams,
    out: &mut Vec<SpeechInterval>,
) -> ScanState {
    if prob >= params.threshold {
        return match state {
            ScanState::Idle => ScanState::Triggered {
                start: offset,
                pending_end: None,
            },
            // Speech resumed before the silence was confirmed.
            ScanState::Triggered { start, .. } => ScanState::Triggered {
                start,
                pending_end: None,
            },
        };
    }

    let ScanState::Triggered { start, pending_end } = state else {
        return state;
    };

    if prob >= params.neg_threshold() {
        return state;
    }

    let pending_end = pending_end.unwrap_or(offset);
    if offset - pending_end < params.min_silence_samples {
        return ScanState::Triggered {
            start,
            pending_end: Some(pending_end),
        };
    }

    if pending_end - start > params.min_speech_samples {
        out.push(SpeechInterval::new(start, pending_end));
    }
    ScanState::Idle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min_speech: usize, min_silence: usize) -> SegmenterParams {
        SegmenterParams {
            window_size: 512,
            threshold: 0.5,
            neg_threshold_offset: 0.15,
            min_speech_samples: min_speech,
            min_silence_samples: min_silence,
        }
    }

    fn run(probs: &[f32], p: &SegmenterParams) -> Vec<SpeechInterval> {
        let trace = ProbabilityTrace::new(probs.to_vec(), p.window_size).expect("valid trace");
        segment(&trace, p).expect("segment")
    }

    const SCENARIO_A: [f32; 10] = [0.9, 0.9, 0.9, 0.1, 0.1, 0.1, 0.1, 0.1, 0.9, 0.9];

    #[test]
    fn silence_shorter_than_minimum_keeps_one_interval() {
        let out = run(&SCENARIO_A, &params(0, 6 * 512));
        assert_eq!(out, vec![SpeechInterval::new(0, 10 * 512)]);
    }

    #[test]
    fn silence_reaching_minimum_splits_into_two_intervals() {
        let out = run(&SCENARIO_A, &params(0, 3 * 512));
        assert_eq!(
            out,
            vec![
                SpeechInterval::new(0, 3 * 512),
                SpeechInterval::new(8 * 512, 10 * 512),
            ]
        );
    }

    #[test]
    fn empty_trace_yields_nothing() {
        assert!(run(&[], &params(0, 0)).is_empty());
    }

    #[test]
    fn all_silence_yields_nothing() {
        assert!(run(&[0.1; 32], &params(0, 0)).is_empty());
    }

    #[test]
    fn short_trailing_run_is_dropped_at_flush() {
        // 2 windows = 1024 samples, not longer than 1024.
        assert!(run(&[0.9, 0.9], &params(1024, 0)).is_empty());
        assert_eq!(
            run(&[0.9, 0.9], &params(1023, 0)),
            vec![SpeechInterval::new(0, 1024)]
        );
    }

    #[test]
    fn short_closed_run_is_dropped() {
        let out = run(&[0.9, 0.1, 0.1, 0.1], &params(512, 0));
        assert!(out.is_empty());
    }

    #[test]
    fn exact_threshold_triggers_speech() {
        let out = run(&[0.5; 4], &params(0, 0));
        assert_eq!(out, vec![SpeechInterval::new(0, 2048)]);
    }

    #[test]
    fn just_below_threshold_never_triggers() {
        let below = 0.5_f32 - f32::EPSILON;
        assert!(run(&[below; 4], &params(0, 0)).is_empty());
    }

    #[test]
    fn hysteresis_band_does_not_close_speech() {
        // 0.4 is below threshold but above the negative threshold (0.35).
        let out = run(&[0.9, 0.4, 0.4, 0.4, 0.9], &params(0, 0));
        assert_eq!(out, vec![SpeechInterval::new(0, 5 * 512)]);
    }

    #[test]
    fn pending_end_survives_hysteresis_band() {
        // The pending end is set at window 1 and is not cleared by the 0.4 window.
        let out = run(&[0.9, 0.1, 0.4, 0.1, 0.1], &params(0, 2 * 512));
        assert_eq!(out, vec![SpeechInterval::new(0, 512)]);
    }

    #[test]
    fn resumed_speech_cancels_pending_end() {
        let out = run(&[0.9, 0.1, 0.9, 0.1, 0.1, 0.1], &params(0, 2 * 512));
        assert_eq!(out, vec![SpeechInterval::new(0, 3 * 512)]);
    }

    #[test]
    fn flush_uses_declared_audio_length() -> anyhow::Result<()> {
        let p = params(0, 0);
        let trace = ProbabilityTrace::with_total_samples(vec![0.1, 0.9, 0.9], 512, 1_300)?;
        let out = segment(&trace, &p)?;
        assert_eq!(out, vec![SpeechInterval::new(512, 1_300)]);
        Ok(())
    }

    #[test]
    fn invalid_params_fail_before_scanning() {
        let trace = ProbabilityTrace::new(vec![0.9], 512).expect("valid trace");

        let bad_threshold = SegmenterParams {
            threshold: 1.0,
            ..params(0, 0)
        };
        assert!(matches!(
            segment(&trace, &bad_threshold),
            Err(Error::InvalidConfig(_))
        ));

        let bad_offset = SegmenterParams {
            neg_threshold_offset: 0.6,
            ..params(0, 0)
        };
        assert!(matches!(
            segment(&trace, &bad_offset),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn mismatched_window_size_is_rejected() {
        let trace = ProbabilityTrace::new(vec![0.9], 256).expect("valid trace");
        assert!(matches!(
            segment(&trace, &params(0, 0)),
            Err(Error::InvalidConfig(_))
        ));
    }
}
