//! High-level API for turning long-form audio into subtitles.
//!
//! `Autocut` owns the two long-lived collaborators: a speech-probability model and a
//! transcriber. Both are loaded once and reused across inputs. Per input it wires up
//! decoding → speech detection → per-interval transcription → alignment → assembly → encoding,
//! while each of those pieces stays testable in its own module.

use std::io::{BufWriter, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::align::align;
use crate::compact_srt_encoder::CompactSrtEncoder;
use crate::cut::collect_chunks;
use crate::decoder::decode_to_mono;
use crate::interval::SpeechInterval;
use crate::json_array_encoder::JsonArrayEncoder;
use crate::opts::{Opts, VadMode};
use crate::output_type::OutputType;
use crate::srt_encoder::SrtEncoder;
use crate::subtitle::{SubtitleEntry, assemble};
use crate::subtitle_encoder::SubtitleEncoder;
use crate::transcriber::{Transcriber, TranscriptionResult};
use crate::vad::{ProbabilityModel, VadProcessor};
use crate::vtt_encoder::VttEncoder;
use crate::{Error, Result};

/// The main high-level entry point.
///
/// Typical usage:
/// - Construct once (model loading happens in the collaborators).
/// - Call `transcribe` / `transcribe_samples` / `cut` for as many inputs as needed.
///
/// Methods take `&mut self` because both collaborators carry per-call state.
pub struct Autocut<P, T> {
    vad: VadProcessor<P>,
    transcriber: T,
    cancel: Option<Arc<AtomicBool>>,
}

impl<P: ProbabilityModel, T: Transcriber> Autocut<P, T> {
    pub fn new(model: P, transcriber: T) -> Self {
        Self {
            vad: VadProcessor::new(model),
            transcriber,
            cancel: None,
        }
    }

    /// Observe `flag` between transcriber calls; once it is set the run stops with
    /// [`Error::Cancelled`] and no partial output is produced.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Refined speech intervals (sample offsets) for mono 16 kHz `samples`.
    pub fn detect_speech(&mut self, samples: &[f32], opts: &Opts) -> Result<Vec<SpeechInterval>> {
        opts.validate()?;
        self.speech_intervals(samples, opts)
    }

    /// Run the whole pipeline over mono 16 kHz `samples` and return numbered subtitle entries.
    pub fn transcribe_samples(&mut self, samples: &[f32], opts: &Opts) -> Result<Vec<SubtitleEntry>> {
        opts.validate()?;

        let intervals = self.speech_intervals(samples, opts)?;
        let results = self.transcribe_intervals(samples, &intervals, opts)?;

        let records = align(&results, &opts.align_opts(samples.len()));
        let entries = assemble(&records)?;

        debug!(
            intervals = intervals.len(),
            records = records.len(),
            entries = entries.len(),
            "assembled subtitles"
        );
        Ok(entries)
    }

    /// Decode `r`, transcribe it and write subtitles in `opts.output_type` format to `w`.
    ///
    /// We accept a generic `Read` rather than a filename so callers can pass files, stdin, or
    /// any other byte stream.
    pub fn transcribe<R, W>(&mut self, r: R, w: W, opts: &Opts) -> Result<()>
    where
        R: Read + Send + 'static,
        W: Write,
    {
        // Fail on bad configuration before spending time decoding.
        opts.validate()?;

        let samples = decode_to_mono(r, None)?;
        let entries = self.transcribe_samples(&samples, opts)?;
        encode_entries(&entries, w, opts.output_type)
    }

    /// Speech-only audio: the detected intervals of `samples`, concatenated.
    pub fn cut(&mut self, samples: &[f32], opts: &Opts) -> Result<Vec<f32>> {
        let intervals = self.detect_speech(samples, opts)?;
        collect_chunks(samples, &intervals)
    }

    pub fn vad(&self) -> &VadProcessor<P> {
        &self.vad
    }

    pub fn transcriber_mut(&mut self) -> &mut T {
        &mut self.transcriber
    }

    fn speech_intervals(&mut self, samples: &[f32], opts: &Opts) -> Result<Vec<SpeechInterval>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        match opts.vad {
            VadMode::WholeInput => Ok(vec![SpeechInterval::new(0, samples.len())]),
            VadMode::Detect => {
                self.vad.set_policy(opts.policy)?;
                self.vad.detect(samples)
            }
        }
    }

    fn transcribe_intervals(
        &mut self,
        samples: &[f32],
        intervals: &[SpeechInterval],
        opts: &Opts,
    ) -> Result<Vec<TranscriptionResult>> {
        let started = Instant::now();
        let transcribe_opts = opts.transcribe_opts();
        let mut results = Vec::with_capacity(intervals.len());

        for interval in intervals {
            if self
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                info!(done = results.len(), total = intervals.len(), "transcription cancelled");
                return Err(Error::Cancelled);
            }

            let spans = self
                .transcriber
                .transcribe(&samples[interval.start..interval.end], &transcribe_opts)?;

            results.push(TranscriptionResult {
                interval: *interval,
                spans,
            });
        }

        info!(
            intervals = intervals.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "done transcription"
        );
        Ok(results)
    }
}

/// Write `entries` to `w` using the encoder for `output_type`.
pub fn encode_entries<W: Write>(
    entries: &[SubtitleEntry],
    w: W,
    output_type: OutputType,
) -> Result<()> {
    // Buffer output for efficiency (especially important for stdout).
    let writer = BufWriter::new(w);

    // We keep encoder selection explicit (no trait objects).
    match output_type {
        OutputType::Srt => write_with(SrtEncoder::new(writer), entries),
        OutputType::CompactSrt => write_with(CompactSrtEncoder::new(writer), entries),
        OutputType::Vtt => write_with(VttEncoder::new(writer), entries),
        OutputType::Json => write_with(JsonArrayEncoder::new(writer), entries),
    }
}

fn write_with<E: SubtitleEncoder>(mut encoder: E, entries: &[SubtitleEntry]) -> Result<()> {
    let run_res = entries.iter().try_for_each(|e| encoder.write_entry(e));
    merge_run_and_close(run_res, encoder.close())
}

fn merge_run_and_close(run_res: Result<()>, close_res: Result<()>) -> Result<()> {
    match (run_res, close_res) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "failed to close encoder after write error");
            Err(err)
        }
    }
}
