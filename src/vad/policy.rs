use serde::Deserialize;

use crate::Result;
use crate::interval::{ms_to_samples, seconds_to_samples};

use super::refine::RefineParams;
use super::segmenter::SegmenterParams;

/// Policy knobs for speech detection and interval refinement.
///
/// These values are expressed in human-friendly units (ms, seconds, probabilities) and are
/// converted to sample counts once, at the sample rate of the audio being processed.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VadPolicy {
    /// Speech probability at or above which a window counts as speech.
    pub threshold: f32,

    /// Distance below `threshold` a window must fall to count as silence.
    pub neg_threshold_offset: f32,

    /// Number of samples fed to the probability model per window.
    pub window_size_samples: usize,

    /// Raw speech runs must be longer than this to be kept.
    pub min_speech_ms: u32,

    /// Silence must persist this long before a speech run is closed.
    pub min_silence_ms: u32,

    /// Padding negotiated between neighbouring raw speech runs.
    pub speech_pad_ms: u32,

    /// Padded intervals no longer than this are dropped before expansion.
    pub min_segment_seconds: f64,

    /// Extra audio kept before each interval, clamped to the previous interval.
    pub expand_head_seconds: f64,

    /// Extra audio kept after each interval, clamped to the next interval.
    pub expand_tail_seconds: f64,

    /// Intervals that start closer than this to the running merged end are merged.
    pub merge_gap_seconds: f64,
}

/// Default policy tuned for "one subtitle block per utterance".
pub const DEFAULT_VAD_POLICY: VadPolicy = VadPolicy {
    threshold: 0.5,
    neg_threshold_offset: 0.15,
    window_size_samples: 512,
    min_speech_ms: 250,
    min_silence_ms: 100,
    speech_pad_ms: 30,
    min_segment_seconds: 1.0,
    expand_head_seconds: 0.2,
    expand_tail_seconds: 0.0,
    merge_gap_seconds: 0.5,
};

impl Default for VadPolicy {
    fn default() -> Self {
        DEFAULT_VAD_POLICY
    }
}

impl VadPolicy {
    /// Segmenter parameters in samples at `sample_rate_hz`.
    pub fn segmenter_params(&self, sample_rate_hz: u32) -> SegmenterParams {
        SegmenterParams {
            window_size: self.window_size_samples,
            threshold: self.threshold,
            neg_threshold_offset: self.neg_threshold_offset,
            min_speech_samples: ms_to_samples(self.min_speech_ms, sample_rate_hz),
            min_silence_samples: ms_to_samples(self.min_silence_ms, sample_rate_hz),
        }
    }

    /// Refinement parameters in samples at `sample_rate_hz`.
    pub fn refine_params(&self, sample_rate_hz: u32) -> RefineParams {
        RefineParams {
            speech_pad: ms_to_samples(self.speech_pad_ms, sample_rate_hz),
            short_threshold: seconds_to_samples(self.min_segment_seconds, sample_rate_hz),
            expand_head: seconds_to_samples(self.expand_head_seconds, sample_rate_hz),
            expand_tail: seconds_to_samples(self.expand_tail_seconds, sample_rate_hz),
            merge_gap: seconds_to_samples(self.merge_gap_seconds, sample_rate_hz),
        }
    }

    /// Fail fast on values the segmenter or refiner cannot work with.
    pub fn validate(&self) -> Result<()> {
        // Segmenter checks are shared so a policy and hand-built params agree on what is valid.
        self.segmenter_params(crate::audio_pipeline::TARGET_SAMPLE_RATE)
            .validate()?;

        let durations = [
            ("min_segment_seconds", self.min_segment_seconds),
            ("expand_head_seconds", self.expand_head_seconds),
            ("expand_tail_seconds", self.expand_tail_seconds),
            ("merge_gap_seconds", self.merge_gap_seconds),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(crate::Error::config(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn default_policy_converts_to_sample_counts() {
        let seg = DEFAULT_VAD_POLICY.segmenter_params(16_000);
        assert_eq!(seg.window_size, 512);
        assert_eq!(seg.min_speech_samples, 4_000);
        assert_eq!(seg.min_silence_samples, 1_600);

        let refine = DEFAULT_VAD_POLICY.refine_params(16_000);
        assert_eq!(refine.speech_pad, 480);
        assert_eq!(refine.short_threshold, 16_000);
        assert_eq!(refine.expand_head, 3_200);
        assert_eq!(refine.expand_tail, 0);
        assert_eq!(refine.merge_gap, 8_000);
    }

    #[test]
    fn default_policy_is_valid() -> anyhow::Result<()> {
        DEFAULT_VAD_POLICY.validate()?;
        Ok(())
    }

    #[test]
    fn negative_threshold_must_stay_positive() {
        let policy = VadPolicy {
            threshold: 0.15,
            neg_threshold_offset: 0.15,
            ..DEFAULT_VAD_POLICY
        };
        assert!(matches!(policy.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn negative_durations_are_rejected() {
        let policy = VadPolicy {
            merge_gap_seconds: -0.5,
            ..DEFAULT_VAD_POLICY
        };
        let err = policy.validate().unwrap_err();
        assert!(err.to_string().contains("merge_gap_seconds"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() -> anyhow::Result<()> {
        let policy: VadPolicy = serde_json::from_str(r#"{ "threshold": 0.6 }"#)?;
        assert_eq!(policy.threshold, 0.6);
        assert_eq!(policy.window_size_samples, 512);
        assert_eq!(policy.merge_gap_seconds, 0.5);
        Ok(())
    }
}
