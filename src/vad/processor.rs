use std::time::Instant;

use tracing::{debug, info};

use crate::audio_pipeline::TARGET_SAMPLE_RATE;
use crate::interval::SpeechInterval;
use crate::{Error, Result};

use super::policy::{DEFAULT_VAD_POLICY, VadPolicy};
use super::refine::{pad_speech, refine};
use super::segmenter::segment;
use super::trace::{ProbabilityModel, ProbabilityTrace, build_probability_trace};

/// Voice Activity Detection (VAD) processor.
///
/// Owns a [`ProbabilityModel`] and turns a contiguous buffer of mono samples at
/// [`TARGET_SAMPLE_RATE`] into refined speech intervals.
pub struct VadProcessor<M> {
    model: M,
    policy: VadPolicy,
}

impl<M: ProbabilityModel> VadProcessor<M> {
    /// Wrap `model` with the default policy, adopting the model's window size.
    pub fn new(model: M) -> Self {
        let policy = VadPolicy {
            window_size_samples: model.window_size(),
            ..DEFAULT_VAD_POLICY
        };
        Self { model, policy }
    }

    /// Wrap `model` with a custom policy. Fails fast on an invalid policy.
    pub fn with_policy(model: M, policy: VadPolicy) -> Result<Self> {
        let mut processor = Self::new(model);
        processor.set_policy(policy)?;
        Ok(processor)
    }

    pub fn policy(&self) -> VadPolicy {
        self.policy
    }

    /// Replace the policy. The policy window size must match the model's.
    pub fn set_policy(&mut self, policy: VadPolicy) -> Result<()> {
        policy.validate()?;
        if policy.window_size_samples != self.model.window_size() {
            return Err(Error::config(format!(
                "policy window size {} does not match model window size {}",
                policy.window_size_samples,
                self.model.window_size()
            )));
        }
        self.policy = policy;
        Ok(())
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Score `samples` and return refined speech intervals.
    pub fn detect(&mut self, samples_16k_mono: &[f32]) -> Result<Vec<SpeechInterval>> {
        let started = Instant::now();

        let trace = build_probability_trace(&mut self.model, samples_16k_mono)?;
        let intervals = detect_from_trace(&trace, &self.policy, TARGET_SAMPLE_RATE)?;

        info!(
            intervals = intervals.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "done voice activity detection"
        );

        Ok(intervals)
    }
}

/// Raw speech timestamps for `trace`: segmentation followed by neighbour-aware padding.
pub fn speech_timestamps(
    trace: &ProbabilityTrace,
    policy: &VadPolicy,
    sample_rate_hz: u32,
) -> Result<Vec<SpeechInterval>> {
    let raw = segment(trace, &policy.segmenter_params(sample_rate_hz))?;
    let pad = policy.refine_params(sample_rate_hz).speech_pad;
    let padded = pad_speech(&raw, pad, trace.total_samples());

    debug!(raw = raw.len(), pad, "padded raw speech intervals");
    Ok(padded)
}

/// Full detection chain over an existing trace: segment → pad → filter → expand → merge.
pub fn detect_from_trace(
    trace: &ProbabilityTrace,
    policy: &VadPolicy,
    sample_rate_hz: u32,
) -> Result<Vec<SpeechInterval>> {
    policy.validate()?;
    let timestamps = speech_timestamps(trace, policy, sample_rate_hz)?;
    Ok(refine(
        &timestamps,
        &policy.refine_params(sample_rate_hz),
        trace.total_samples(),
    ))
}
