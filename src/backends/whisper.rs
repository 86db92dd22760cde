use std::os::raw::{c_char, c_void};
use std::path::Path;
use std::sync::Once;

use anyhow::{Context, Result, ensure};
use tracing::debug;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperSegment,
};

use crate::transcriber::{TextSpan, TranscribeOpts, Transcriber};

/// [`Transcriber`] powered by `whisper-rs` / `whisper.cpp`.
///
/// The model is loaded once; every call creates a fresh decoding state, so no text context
/// carries over between intervals.
pub struct WhisperTranscriber {
    ctx: WhisperContext,
}

impl WhisperTranscriber {
    /// Load a whisper.cpp (ggml) model from disk.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        ensure!(
            model_path.is_file(),
            "model not found at '{}'",
            model_path.display()
        );

        // Whisper can be very chatty; keep it quiet so callers own stdout/stderr.
        silence_whisper_logs();

        let path = model_path
            .to_str()
            .with_context(|| format!("model path is not UTF-8: '{}'", model_path.display()))?;
        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .with_context(|| format!("failed to load model from path: {path}"))?;

        Ok(Self { ctx })
    }

    /// Access the underlying Whisper context.
    pub fn context(&self) -> &WhisperContext {
        &self.ctx
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(
        &mut self,
        samples_16k_mono: &[f32],
        opts: &TranscribeOpts<'_>,
    ) -> Result<Vec<TextSpan>> {
        if samples_16k_mono.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self
            .ctx
            .create_state()
            .context("failed to create whisper state")?;

        state
            .full(build_full_params(opts), samples_16k_mono)
            .context("failed to run whisper full()")?;

        let spans = state
            .as_iter()
            .map(to_span)
            .collect::<Result<Vec<_>>>()?;

        debug!(samples = samples_16k_mono.len(), spans = spans.len(), "whisper pass done");
        Ok(spans)
    }
}

fn build_full_params<'a>(opts: &TranscribeOpts<'a>) -> FullParams<'a, 'a> {
    let mut params = FullParams::new(SamplingStrategy::BeamSearch {
        beam_size: 5,
        patience: 1.0,
    });

    params.set_n_threads(num_cpus::get() as i32);
    params.set_language(opts.language);
    if let Some(prompt) = opts.prompt {
        params.set_initial_prompt(prompt);
    }
    params.set_no_context(true);
    params.set_single_segment(false);

    params.set_print_progress(false);
    params.set_print_special(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    params
}

fn to_span(segment: WhisperSegment) -> Result<TextSpan> {
    let text = segment.to_str().context("failed to get segment text")?;

    Ok(TextSpan::new(
        centiseconds_to_seconds(segment.start_timestamp()),
        centiseconds_to_seconds(segment.end_timestamp()),
        text,
    ))
}

/// Whisper reports timestamps in centiseconds, with `-1` for "unknown".
fn centiseconds_to_seconds(value: i64) -> f64 {
    if value < 0 { 0.0 } else { value as f64 / 100.0 }
}

unsafe extern "C" fn discard_whisper_log(
    _level: u32,
    _c_msg: *const c_char,
    _user_data: *mut c_void,
) {
}

/// Route whisper.cpp logging to a no-op callback, once per process.
fn silence_whisper_logs() {
    static INIT: Once = Once::new();

    INIT.call_once(|| unsafe {
        whisper_rs::set_log_callback(Some(discard_whisper_log), std::ptr::null_mut());
    });
}
