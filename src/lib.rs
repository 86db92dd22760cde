//! `autocut` — speech segmentation and subtitle assembly for long-form audio.
//!
//! This crate provides:
//! - Voice activity detection: a hysteresis segmenter over a per-window speech-probability
//!   trace, followed by padding, filtering, expansion and merging of the raw intervals
//! - Per-interval transcription through a pluggable `Transcriber` (whisper.cpp built in)
//! - Alignment of interval-relative text spans onto one global timeline, with
//!   `< No Speech >` markers for long gaps
//! - Subtitle assembly and streaming encoders (SRT, compact SRT, WebVTT, JSON)
//! - Speech-only audio export
//!
//! Most consumers should start with [`Autocut`].

mod error;
pub use error::{Error, Result};

// High-level API.
pub mod autocut;
pub mod opts;
pub use autocut::{Autocut, encode_entries};
pub use opts::{Opts, VadMode};

// Timeline primitives and the core stages.
pub mod align;
pub mod interval;
pub mod subtitle;
pub mod transcriber;
pub mod vad;

// Audio input and speech-only export.
pub mod audio_pipeline;
pub mod cut;
pub mod decoder;

// Output selection and encoder interfaces.
pub mod output_type;
pub mod subtitle_encoder;

// Output encoders that serialize entries into various formats.
pub mod compact_srt_encoder;
pub mod json_array_encoder;
pub mod srt_encoder;
pub mod vtt_encoder;

// Built-in collaborators (whisper.cpp transcriber, Silero VAD).
pub mod backends;

// Logging configuration for binaries.
#[cfg(feature = "logging")]
pub mod logging;
