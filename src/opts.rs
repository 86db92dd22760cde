use serde::Deserialize;

use crate::align::{AlignOpts, DEFAULT_GAP_MARKER_SECONDS};
use crate::audio_pipeline::TARGET_SAMPLE_RATE;
use crate::interval::samples_to_seconds;
use crate::output_type::OutputType;
use crate::transcriber::TranscribeOpts;
use crate::vad::{DEFAULT_VAD_POLICY, VadPolicy};
use crate::{Error, Result};

/// How speech intervals are chosen for an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VadMode {
    /// Run the probability model and refine its intervals.
    #[default]
    Detect,

    /// Treat the whole input as one speech interval, skipping the probability model.
    ///
    /// Useful for audio that has already been cut down to speech.
    WholeInput,
}

/// Options that control how a transcription is performed.
///
/// This struct represents *library-level configuration*, not CLI flags directly. The CLI maps
/// user input (and an optional JSON config file) into this type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Opts {
    pub vad: VadMode,

    /// Optional language hint (e.g. `"en"`, `"zh"`). `None` lets the transcriber auto-detect.
    pub language: Option<String>,

    /// Optional initial prompt passed to the transcriber for every interval.
    pub prompt: Option<String>,

    /// The desired output format for subtitle entries.
    pub output_type: OutputType,

    /// Gaps between records longer than this many seconds get a `< No Speech >` entry.
    pub gap_marker_seconds: f64,

    /// Also mark a long gap between the last record and the end of the input.
    pub mark_trailing_gap: bool,

    pub policy: VadPolicy,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            vad: VadMode::default(),
            language: None,
            prompt: None,
            output_type: OutputType::default(),
            gap_marker_seconds: DEFAULT_GAP_MARKER_SECONDS,
            mark_trailing_gap: false,
            policy: DEFAULT_VAD_POLICY,
        }
    }
}

impl Opts {
    /// Reject out-of-range configuration before any audio is processed.
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;

        if !self.gap_marker_seconds.is_finite() || self.gap_marker_seconds < 0.0 {
            return Err(Error::config(format!(
                "gap_marker_seconds must be a non-negative number of seconds, got {}",
                self.gap_marker_seconds
            )));
        }

        if self
            .language
            .as_deref()
            .is_some_and(|lang| lang.trim().is_empty())
        {
            return Err(Error::config("language hint must not be empty"));
        }

        Ok(())
    }

    pub fn transcribe_opts(&self) -> TranscribeOpts<'_> {
        TranscribeOpts {
            language: self.language.as_deref(),
            prompt: self.prompt.as_deref(),
        }
    }

    /// Aligner settings for an input of `total_samples` samples at the analysis rate.
    pub fn align_opts(&self, total_samples: usize) -> AlignOpts {
        AlignOpts {
            sample_rate_hz: TARGET_SAMPLE_RATE,
            gap_marker_seconds: self.gap_marker_seconds,
            total_seconds: self
                .mark_trailing_gap
                .then(|| samples_to_seconds(total_samples, TARGET_SAMPLE_RATE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> anyhow::Result<()> {
        let opts = Opts::default();
        opts.validate()?;
        assert_eq!(opts.vad, VadMode::Detect);
        assert_eq!(opts.gap_marker_seconds, 1.0);
        assert!(!opts.mark_trailing_gap);
        Ok(())
    }

    #[test]
    fn invalid_gap_marker_is_rejected() {
        for gap in [-0.5, f64::NAN, f64::INFINITY] {
            let opts = Opts {
                gap_marker_seconds: gap,
                ..Opts::default()
            };
            assert!(matches!(opts.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let mut opts = Opts::default();
        opts.policy.threshold = 1.5;
        assert!(matches!(opts.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn partial_json_config_fills_in_defaults() -> anyhow::Result<()> {
        let opts: Opts = serde_json::from_str(
            r#"{
                "vad": "whole_input",
                "language": "zh",
                "output_type": "compact-srt",
                "policy": { "merge_gap_seconds": 0.25 }
            }"#,
        )?;

        assert_eq!(opts.vad, VadMode::WholeInput);
        assert_eq!(opts.language.as_deref(), Some("zh"));
        assert_eq!(opts.output_type, OutputType::CompactSrt);
        assert_eq!(opts.policy.merge_gap_seconds, 0.25);
        assert_eq!(opts.policy.threshold, DEFAULT_VAD_POLICY.threshold);
        assert_eq!(opts.gap_marker_seconds, DEFAULT_GAP_MARKER_SECONDS);
        Ok(())
    }

    #[test]
    fn trailing_gap_needs_opt_in() {
        let mut opts = Opts::default();
        assert_eq!(opts.align_opts(32_000).total_seconds, None);

        opts.mark_trailing_gap = true;
        assert_eq!(opts.align_opts(32_000).total_seconds, Some(2.0));
    }
}
