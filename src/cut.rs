//! Speech-only audio export.
//!
//! Given refined speech intervals, split the input timeline into speech and non-speech pieces,
//! keep or drop them, and write the result as a 16 kHz mono WAV.

use std::io::{Read, Seek, Write};

use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::audio_pipeline::TARGET_SAMPLE_RATE;
use crate::interval::{SpeechInterval, is_well_formed};
use crate::{Error, Result};

/// One piece of the input timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelinePiece {
    pub interval: SpeechInterval,
    pub is_speech: bool,
}

/// Partition `[0, total_samples)` into alternating speech and non-speech pieces.
///
/// Intervals must be sorted and non-overlapping; parts past `total_samples` are clipped and
/// empty pieces are omitted.
pub fn timeline_partition(
    intervals: &[SpeechInterval],
    total_samples: usize,
) -> Result<Vec<TimelinePiece>> {
    ensure_well_formed(intervals)?;

    let mut pieces = Vec::with_capacity(intervals.len() * 2 + 1);
    let mut cursor = 0;

    for iv in intervals {
        let start = iv.start.min(total_samples);
        let end = iv.end.min(total_samples);

        if start > cursor {
            pieces.push(TimelinePiece {
                interval: SpeechInterval::new(cursor, start),
                is_speech: false,
            });
        }
        if end > start {
            pieces.push(TimelinePiece {
                interval: SpeechInterval::new(start, end),
                is_speech: true,
            });
        }
        cursor = cursor.max(end);
    }

    if total_samples > cursor {
        pieces.push(TimelinePiece {
            interval: SpeechInterval::new(cursor, total_samples),
            is_speech: false,
        });
    }

    Ok(pieces)
}

/// Concatenate the speech parts of `samples`.
pub fn collect_chunks(samples: &[f32], intervals: &[SpeechInterval]) -> Result<Vec<f32>> {
    gather(samples, intervals, true)
}

/// Concatenate everything except the speech parts of `samples`.
pub fn drop_chunks(samples: &[f32], intervals: &[SpeechInterval]) -> Result<Vec<f32>> {
    gather(samples, intervals, false)
}

fn gather(samples: &[f32], intervals: &[SpeechInterval], keep_speech: bool) -> Result<Vec<f32>> {
    let pieces = timeline_partition(intervals, samples.len())?;

    let mut out = Vec::new();
    for piece in pieces.iter().filter(|p| p.is_speech == keep_speech) {
        out.extend_from_slice(&samples[piece.interval.start..piece.interval.end]);
    }
    Ok(out)
}

fn ensure_well_formed(intervals: &[SpeechInterval]) -> Result<()> {
    if is_well_formed(intervals) {
        Ok(())
    } else {
        Err(Error::msg(
            "speech intervals must be sorted, non-empty and non-overlapping",
        ))
    }
}

fn wav_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write `samples` as 16-bit PCM mono WAV at the analysis rate. Values are clamped to `[-1, 1]`.
pub fn write_wav<W>(writer: W, samples: &[f32]) -> Result<()>
where
    W: Write + Seek,
{
    let mut wav = WavWriter::new(writer, wav_spec())?;
    for &s in samples {
        let pcm = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        wav.write_sample(pcm)?;
    }
    wav.finalize()?;
    Ok(())
}

/// Load a 16 kHz mono 16-bit WAV into normalized samples.
pub fn read_wav<R>(reader: R) -> Result<Vec<f32>>
where
    R: Read + Seek,
{
    let mut reader = WavReader::new(reader).context("failed to read WAV data from reader")?;
    let spec = reader.spec();

    if spec.channels != 1 || spec.sample_rate != TARGET_SAMPLE_RATE {
        return Err(Error::msg(format!(
            "expected mono {TARGET_SAMPLE_RATE} Hz WAV, got {} channels at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    reader
        .samples::<i16>()
        .map(|s| -> Result<f32> { Ok(s? as f32 / i16::MAX as f32) })
        .collect()
}
