use tracing::debug;

use crate::{Error, Result};

/// A voice-activity model that scores one fixed-size window of audio at a time.
///
/// Implementations may carry recurrent state between windows; [`build_probability_trace`]
/// calls [`ProbabilityModel::reset`] before scoring a new input.
pub trait ProbabilityModel {
    /// Number of samples the model expects per window.
    fn window_size(&self) -> usize;

    /// Clear any state carried over from a previous input.
    fn reset(&mut self);

    /// Speech probability for exactly `window_size()` samples.
    fn predict(&mut self, window: &[f32]) -> anyhow::Result<f32>;
}

/// Per-window speech probabilities for one contiguous audio buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTrace {
    probs: Vec<f32>,
    window_size: usize,
    total_samples: usize,
}

impl ProbabilityTrace {
    /// Build a trace whose audio length is exactly `window_size * probs.len()`.
    pub fn new(probs: Vec<f32>, window_size: usize) -> Result<Self> {
        let total_samples = window_size.saturating_mul(probs.len());
        Self::with_total_samples(probs, window_size, total_samples)
    }

    /// Build a trace for audio of `total_samples`, where the last window may be short.
    pub fn with_total_samples(
        probs: Vec<f32>,
        window_size: usize,
        total_samples: usize,
    ) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::config("window size must be greater than zero"));
        }

        let expected_windows = total_samples.div_ceil(window_size);
        if expected_windows != probs.len() {
            return Err(Error::InvalidTrace(format!(
                "{total_samples} samples at window size {window_size} need {expected_windows} probabilities, got {}",
                probs.len()
            )));
        }

        validate_probabilities(&probs)?;

        Ok(Self {
            probs,
            window_size,
            total_samples,
        })
    }

    pub fn probs(&self) -> &[f32] {
        &self.probs
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Length of the underlying audio in samples.
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}

/// Score `samples` window by window, zero-padding the final short window.
///
/// Model failures propagate unmodified; out-of-range probabilities are rejected rather than
/// clamped.
pub fn build_probability_trace<M>(model: &mut M, samples: &[f32]) -> Result<ProbabilityTrace>
where
    M: ProbabilityModel + ?Sized,
{
    let window_size = model.window_size();
    if window_size == 0 {
        return Err(Error::config("probability model reported a zero window size"));
    }

    model.reset();

    let mut probs = Vec::with_capacity(samples.len().div_ceil(window_size));
    let mut padded = vec![0.0f32; window_size];

    for chunk in samples.chunks(window_size) {
        let prob = if chunk.len() == window_size {
            model.predict(chunk)?
        } else {
            padded[..chunk.len()].copy_from_slice(chunk);
            padded[chunk.len()..].fill(0.0);
            model.predict(&padded)?
        };
        probs.push(prob);
    }

    debug!(
        windows = probs.len(),
        window_size,
        samples = samples.len(),
        "built speech probability trace"
    );

    ProbabilityTrace::with_total_samples(probs, window_size, samples.len())
}

fn validate_probabilities(probs: &[f32]) -> Result<()> {
    match probs
        .iter()
        .position(|p| !p.is_finite() || !(0.0..=1.0).contains(p))
    {
        Some(index) => Err(Error::InvalidProbability {
            index,
            value: probs[index],
        }),
        None => Ok(()),
    }
}
