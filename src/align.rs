//! Re-project per-interval transcription output onto the input timeline.
//!
//! Each span is shifted by its interval's start, clipped to its interval's end, and emitted in
//! order. Uncovered stretches longer than the gap-marker threshold become explicit silence
//! records.

use serde::Serialize;
use tracing::{debug, warn};

use crate::audio_pipeline::TARGET_SAMPLE_RATE;
use crate::transcriber::TranscriptionResult;

/// Text carried by inserted silence records.
pub const NO_SPEECH_MARKER: &str = "< No Speech >";

/// Default minimum uncovered duration (seconds) that earns a silence record.
pub const DEFAULT_GAP_MARKER_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Speech,
    Silence,
}

/// A `(start, end, text)` unit on the absolute timeline, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalRecord {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
    pub kind: RecordKind,
}

impl GlobalRecord {
    pub fn speech(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
            kind: RecordKind::Speech,
        }
    }

    pub fn silence(start_seconds: f64, end_seconds: f64) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: NO_SPEECH_MARKER.to_owned(),
            kind: RecordKind::Silence,
        }
    }

    pub fn is_silence(&self) -> bool {
        self.kind == RecordKind::Silence
    }
}

/// Alignment settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignOpts {
    /// Rate used to convert interval sample offsets to seconds.
    pub sample_rate_hz: u32,

    /// Gaps strictly longer than this (seconds) get a silence record.
    pub gap_marker_seconds: f64,

    /// Total input duration. When set, a long trailing gap is marked as well.
    pub total_seconds: Option<f64>,
}

impl Default for AlignOpts {
    fn default() -> Self {
        Self {
            sample_rate_hz: TARGET_SAMPLE_RATE,
            gap_marker_seconds: DEFAULT_GAP_MARKER_SECONDS,
            total_seconds: None,
        }
    }
}

/// Map transcription results, ordered by interval start, onto one ordered record list.
///
/// Output records are ordered by start and never overlap. Spans that end up empty or inverted
/// after clipping are discarded with a warning.
pub fn align(results: &[TranscriptionResult], opts: &AlignOpts) -> Vec<GlobalRecord> {
    let mut records = Vec::new();
    let mut prev_end = 0.0_f64;

    for result in results {
        let seg_start = result.interval.start_seconds(opts.sample_rate_hz);
        let seg_end = result.interval.end_seconds(opts.sample_rate_hz);

        for span in &result.spans {
            let start = span.start_seconds + seg_start;
            let end = (span.end_seconds + seg_start).min(seg_end);

            if !start.is_finite() || !end.is_finite() || start > end {
                warn!(
                    start,
                    end,
                    interval_start = result.interval.start,
                    interval_end = result.interval.end,
                    "discarding span that falls outside its interval"
                );
                continue;
            }

            // Keep records disjoint when the model returns overlapping spans.
            let start = start.max(prev_end);
            if start >= end {
                warn!(start, end, prev_end, "discarding empty span");
                continue;
            }

            if start > prev_end + opts.gap_marker_seconds {
                records.push(GlobalRecord::silence(prev_end, start));
            }

            records.push(GlobalRecord::speech(start, end, span.text.clone()));
            prev_end = end;
        }
    }

    if let Some(total) = opts.total_seconds
        && total > prev_end + opts.gap_marker_seconds
    {
        records.push(GlobalRecord::silence(prev_end, total));
    }

    debug!(
        results = results.len(),
        records = records.len(),
        "aligned transcription results"
    );

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::SpeechInterval;
    use crate::transcriber::TextSpan;

    fn result(start: usize, end: usize, spans: Vec<TextSpan>) -> TranscriptionResult {
        TranscriptionResult {
            interval: SpeechInterval::new(start, end),
            spans,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn spans_are_shifted_and_clipped_to_their_interval() {
        // Interval covers 1 s..3 s; the model claims text until 5 s.
        let results = [result(16_000, 48_000, vec![TextSpan::new(0.5, 4.0, "hi")])];
        let out = align(&results, &AlignOpts::default());

        assert_eq!(out.len(), 2);
        assert!(out[0].is_silence());
        assert!(approx(out[0].start_seconds, 0.0));
        assert!(approx(out[0].end_seconds, 1.5));
        assert_eq!(out[1].text, "hi");
        assert!(approx(out[1].start_seconds, 1.5));
        assert!(approx(out[1].end_seconds, 3.0));
    }

    #[test]
    fn span_starting_past_its_interval_is_discarded() {
        // 1000/16000 + 0.5 starts after the interval's 5000/16000 end.
        let results = [result(1_000, 5_000, vec![TextSpan::new(0.5, 4.0, "hi")])];
        assert!(align(&results, &AlignOpts::default()).is_empty());
    }

    #[test]
    fn long_gap_between_spans_gets_a_silence_record() {
        let results = [
            result(0, 32_000, vec![TextSpan::new(0.0, 2.0, "one")]),
            result(80_000, 112_000, vec![TextSpan::new(0.0, 2.0, "two")]),
        ];
        let out = align(&results, &AlignOpts::default());

        let kinds: Vec<_> = out.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RecordKind::Speech, RecordKind::Silence, RecordKind::Speech]
        );
        assert!(approx(out[1].start_seconds, 2.0));
        assert!(approx(out[1].end_seconds, 5.0));
        assert_eq!(out[1].text, NO_SPEECH_MARKER);
    }

    #[test]
    fn short_gaps_are_left_unmarked() {
        let results = [
            result(0, 32_000, vec![TextSpan::new(0.0, 2.0, "one")]),
            result(40_000, 64_000, vec![TextSpan::new(0.0, 1.0, "two")]),
        ];
        let out = align(&results, &AlignOpts::default());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| !r.is_silence()));
    }

    #[test]
    fn gap_exactly_at_threshold_is_not_marked() {
        let results = [result(16_000, 32_000, vec![TextSpan::new(0.0, 0.5, "a")])];
        let out = align(&results, &AlignOpts::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn overlapping_spans_are_clamped_to_previous_end() {
        let results = [result(
            0,
            160_000,
            vec![
                TextSpan::new(0.0, 2.0, "a"),
                TextSpan::new(1.5, 3.0, "b"),
                TextSpan::new(1.0, 1.8, "c"),
            ],
        )];
        let out = align(&results, &AlignOpts::default());

        assert_eq!(out.len(), 2);
        assert!(approx(out[1].start_seconds, 2.0));
        assert!(approx(out[1].end_seconds, 3.0));
        assert!(out.windows(2).all(|w| w[0].end_seconds <= w[1].start_seconds));
    }

    #[test]
    fn trailing_gap_is_marked_when_total_is_known() {
        let results = [result(0, 32_000, vec![TextSpan::new(0.0, 2.0, "one")])];
        let opts = AlignOpts {
            total_seconds: Some(10.0),
            ..AlignOpts::default()
        };
        let out = align(&results, &opts);

        assert_eq!(out.len(), 2);
        assert!(out[1].is_silence());
        assert!(approx(out[1].start_seconds, 2.0));
        assert!(approx(out[1].end_seconds, 10.0));
    }

    #[test]
    fn no_results_no_records() {
        assert!(align(&[], &AlignOpts::default()).is_empty());
    }
}
