//! Voice Activity Detection (VAD).
//!
//! A [`ProbabilityModel`] scores fixed-size windows, the [`segmenter`] turns the resulting
//! trace into raw speech intervals, and the [`mod@refine`] passes pad, filter, expand and merge
//! them into the intervals handed to a transcriber.

mod policy;
mod processor;
pub mod refine;
pub mod segmenter;
mod trace;

pub use policy::{DEFAULT_VAD_POLICY, VadPolicy};
pub use processor::{VadProcessor, detect_from_trace, speech_timestamps};
pub use refine::{
    RefineParams, expand_segments, merge_adjacent_segments, pad_speech, refine,
    remove_short_segments,
};
pub use segmenter::{SegmenterParams, segment};
pub use trace::{ProbabilityModel, ProbabilityTrace, build_probability_trace};
