use serde::Serialize;

use crate::interval::SpeechInterval;

/// A piece of recognized text with timestamps relative to the audio slice it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSpan {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

impl TextSpan {
    pub fn new(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
        }
    }
}

/// Per-call hints forwarded to the transcriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscribeOpts<'a> {
    /// Language hint (e.g. `"en"`, `"zh"`). `None` lets the model detect it.
    pub language: Option<&'a str>,

    /// Text used to prime the decoder (vocabulary, punctuation style).
    pub prompt: Option<&'a str>,
}

/// Pluggable speech-to-text model used by [`crate::Autocut`].
///
/// A transcriber turns one independent slice of mono `f32` samples at
/// [`crate::audio_pipeline::TARGET_SAMPLE_RATE`] into time-ordered spans whose timestamps are
/// relative to the start of that slice.
pub trait Transcriber {
    fn transcribe(
        &mut self,
        samples_16k_mono: &[f32],
        opts: &TranscribeOpts<'_>,
    ) -> anyhow::Result<Vec<TextSpan>>;
}

impl<T: Transcriber + ?Sized> Transcriber for &mut T {
    fn transcribe(
        &mut self,
        samples_16k_mono: &[f32],
        opts: &TranscribeOpts<'_>,
    ) -> anyhow::Result<Vec<TextSpan>> {
        (**self).transcribe(samples_16k_mono, opts)
    }
}

/// Transcriber output for one refined speech interval.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    /// The interval whose audio was transcribed, in samples on the input timeline.
    pub interval: SpeechInterval,

    /// Spans in time order, relative to `interval.start`.
    pub spans: Vec<TextSpan>,
}
