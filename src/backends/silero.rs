//! Silero VAD speech-probability model via ONNX Runtime.
//!
//! The v5 export takes three inputs: `input` (`[1, context + window]`), the recurrent `state`
//! (`[2, 1, 128]`) and the sample rate `sr`. It returns `output` (the speech probability) and
//! `stateN`, which is fed back on the next call.

use std::path::Path;

use anyhow::{Context, Result, anyhow, ensure};
use ort::session::{Session, SessionInputValue};
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use tracing::debug;

use crate::audio_pipeline::TARGET_SAMPLE_RATE;
use crate::vad::ProbabilityModel;

/// Samples per window at 16 kHz.
pub const SILERO_WINDOW_SIZE: usize = 512;

/// Trailing samples of the previous window prepended to the next one.
const CONTEXT_SIZE: usize = 64;

const STATE_SHAPE: [usize; 3] = [2, 1, 128];
const STATE_LEN: usize = STATE_SHAPE[0] * STATE_SHAPE[1] * STATE_SHAPE[2];

pub struct SileroVad {
    session: Session,
    recurrence: Recurrence,
    sr_type: TensorElementType,
}

/// Recurrent state and audio context carried between windows.
///
/// Both only advance once a window has been scored successfully.
#[derive(Debug, Clone, PartialEq)]
struct Recurrence {
    state: Vec<f32>,
    context: Vec<f32>,
}

impl Recurrence {
    fn new() -> Self {
        Self {
            state: vec![0.0; STATE_LEN],
            context: vec![0.0; CONTEXT_SIZE],
        }
    }

    fn reset(&mut self) {
        self.recurrence.reset();
    }

    /// Model input for `window`: the previous context followed by the window itself.
    fn input(&self, window: &[f32]) -> Vec<f32> {
        let mut input = Vec::with_capacity(CONTEXT_SIZE + window.len());
        input.extend_from_slice(&self.context);
        input.extend_from_slice(window);
        input
    }

    /// Record a scored `window` and the model's next state, if it returned one.
    fn advance(&mut self, window: &[f32], next_state: Option<&[f32]>) -> Result<()> {
        if let Some(data) = next_state {
            ensure!(
                data.len() == STATE_LEN,
                "unexpected VAD state size {} (expected {STATE_LEN})",
                data.len()
            );
            self.state.copy_from_slice(data);
        }

        if window.len() >= CONTEXT_SIZE {
            self.context
                .copy_from_slice(&window[window.len() - CONTEXT_SIZE..]);
        }
        Ok(())
    }
}

impl SileroVad {
    /// Load a Silero VAD ONNX export from disk.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        ensure!(
            model_path.is_file(),
            "VAD model not found at '{}'",
            model_path.display()
        );

        let session = Session::builder()
            .context("failed to create ONNX Runtime session builder")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!(
                    "failed to load Silero VAD model from '{}'",
                    model_path.display()
                )
            })?;

        let sr_type = validate_model_io(&session)?;

        Ok(Self {
            session,
            recurrence: Recurrence::new(),
            sr_type,
        })
    }

    fn run(&mut self, window: &[f32]) -> Result<f32> {
        let input = self.recurrence.input(window);
        let input_len = input.len();
        let input = Tensor::from_array(([1usize, input_len], input.into_boxed_slice()))
            .context("failed to build VAD input tensor")?;
        let state = Tensor::from_array((STATE_SHAPE, self.recurrence.state.clone().into_boxed_slice()))
            .context("failed to build VAD state tensor")?;
        let sr = sample_rate_value(self.sr_type)?;

        let inputs: Vec<(String, SessionInputValue<'static>)> = vec![
            ("input".to_owned(), SessionInputValue::Owned(input.into_dyn())),
            ("state".to_owned(), SessionInputValue::Owned(state.into_dyn())),
            ("sr".to_owned(), sr),
        ];

        let outputs = self
            .session
            .run(inputs)
            .context("failed to run Silero VAD model")?;

        let (_, probs) = outputs
            .get("output")
            .ok_or_else(|| anyhow!("Silero VAD results have no `output` tensor"))?
            .try_extract_tensor::<f32>()
            .context("failed to extract VAD output tensor")?;
        let prob = probs
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Silero VAD returned an empty output tensor"))?;

        let next_state = match outputs.get("stateN") {
            Some(value) => Some(
                value
                    .try_extract_tensor::<f32>()
                    .context("failed to extract VAD state tensor")?
                    .1,
            ),
            None => None,
        };
        self.recurrence.advance(window, next_state)?;

        Ok(prob)
    }
}

impl ProbabilityModel for SileroVad {
    fn window_size(&self) -> usize {
        SILERO_WINDOW_SIZE
    }

    fn reset(&mut self) {
        self.recurrence.reset();
    }

    fn predict(&mut self, window: &[f32]) -> Result<f32> {
        ensure!(
            window.len() == SILERO_WINDOW_SIZE,
            "Silero VAD expects {SILERO_WINDOW_SIZE}-sample windows, got {}",
            window.len()
        );
        self.run(window)
    }
}

/// Check the model looks like Silero VAD and return the element type of its `sr` input.
fn validate_model_io(session: &Session) -> Result<TensorElementType> {
    for input in &session.inputs {
        debug!(name = %input.name, ty = %input.input_type, "Silero VAD input");
    }

    let has_input = |name: &str| session.inputs.iter().any(|i| i.name == name);
    ensure!(
        has_input("input") && has_input("state"),
        "model does not look like Silero VAD v5 (expected `input`, `state` and `sr` inputs)"
    );

    let sr = session
        .inputs
        .iter()
        .find(|i| i.name == "sr")
        .ok_or_else(|| anyhow!("Silero VAD model has no `sr` input"))?;

    match sr.input_type {
        ValueType::Tensor { ty, .. } => Ok(ty),
        ref other => Err(anyhow!("Silero input 'sr' is not a tensor: {other}")),
    }
}

fn sample_rate_value(ty: TensorElementType) -> Result<SessionInputValue<'static>> {
    let sr = TARGET_SAMPLE_RATE as i64;
    let value = match ty {
        TensorElementType::Int64 => Tensor::from_array(((), vec![sr].into_boxed_slice()))
            .context("failed to build VAD sr tensor")?
            .into_dyn(),
        TensorElementType::Int32 => Tensor::from_array(((), vec![sr as i32].into_boxed_slice()))
            .context("failed to build VAD sr tensor")?
            .into_dyn(),
        other => return Err(anyhow!("unsupported Silero `sr` element type: {other:?}")),
    };
    Ok(SessionInputValue::Owned(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(value: f32) -> Vec<f32> {
        vec![value; SILERO_WINDOW_SIZE]
    }

    #[test]
    fn input_prepends_context_without_advancing() {
        let recurrence = Recurrence::new();
        let input = recurrence.input(&window(0.5));

        assert_eq!(input.len(), CONTEXT_SIZE + SILERO_WINDOW_SIZE);
        assert!(input[..CONTEXT_SIZE].iter().all(|&s| s == 0.0));
        assert!(input[CONTEXT_SIZE..].iter().all(|&s| s == 0.5));
        assert_eq!(recurrence, Recurrence::new());
    }

    #[test]
    fn advance_keeps_window_tail_and_next_state() -> Result<()> {
        let mut recurrence = Recurrence::new();
        let mut scored = window(0.0);
        scored[SILERO_WINDOW_SIZE - CONTEXT_SIZE..].fill(0.25);

        recurrence.advance(&scored, Some(&[0.75; STATE_LEN]))?;

        assert!(recurrence.context.iter().all(|&s| s == 0.25));
        assert!(recurrence.state.iter().all(|&s| s == 0.75));
        assert!(recurrence.input(&window(1.0))[..CONTEXT_SIZE]
            .iter()
            .all(|&s| s == 0.25));
        Ok(())
    }

    #[test]
    fn rejected_state_leaves_context_untouched() {
        let mut recurrence = Recurrence::new();

        assert!(recurrence.advance(&window(0.9), Some(&[1.0; 3])).is_err());
        assert_eq!(recurrence, Recurrence::new());
    }

    #[test]
    fn reset_clears_both() -> Result<()> {
        let mut recurrence = Recurrence::new();
        recurrence.advance(&window(0.3), Some(&[0.3; STATE_LEN]))?;

        recurrence.reset();
        assert_eq!(recurrence, Recurrence::new());
        Ok(())
    }
}
