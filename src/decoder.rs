//! Decode media (audio/video containers) into mono `f32` at the 16 kHz analysis rate.
//!
//! Input is **unseekable** (`Read` only) via `ReadOnlySource`, so stdin and pipes work. Some
//! container layouts (MP4/MOV with `moov` at the end) need seeking and will fail here.

use std::io::Read;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::AudioBufferRef;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, Track};
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::audio_pipeline::AudioPipeline;

/// Decode the whole input into one mono 16 kHz buffer.
///
/// `hint_extension` (e.g. "wav", "mp3", "mkv") improves probing for ambiguous inputs.
pub fn decode_to_mono<R>(reader: R, hint_extension: Option<&str>) -> Result<Vec<f32>>
where
    R: Read + Send + 'static,
{
    let mut samples = Vec::new();
    decode_to_stream_from_read(reader, hint_extension, |chunk| {
        samples.extend_from_slice(chunk);
        Ok(())
    })?;

    debug!(samples = samples.len(), "decoded input to mono 16 kHz");
    Ok(samples)
}

/// Decode an unseekable input stream and hand normalized chunks to `on_samples` as they are
/// produced.
pub fn decode_to_stream_from_read<R>(
    reader: R,
    hint_extension: Option<&str>,
    mut on_samples: impl FnMut(&[f32]) -> Result<()>,
) -> Result<()>
where
    R: Read + Send + 'static,
{
    // Symphonia's `MediaSource` is `Read + Send + Sync`. We only move the reader, never share
    // it, so a mutex is enough to satisfy `Sync`.
    let source = ReadOnlySource::new(LockedRead::new(reader));
    let (mut format, track) = probe_source_and_pick_default_track(Box::new(source), hint_extension)?;

    let mut decoder = make_decoder_for_track(&track)?;
    let mut pipeline = AudioPipeline::new();

    while let Some(packet) = next_packet(&mut format)? {
        // Ignore packets from non-audio tracks.
        if packet.track_id() != track.id {
            continue;
        }

        decode_packet_and_then(&mut decoder, &packet, |decoded| {
            pipeline
                .push_decoded(&decoded, &mut on_samples)
                .context("audio pipeline failed while processing decoded samples")
        })?;
    }

    // Flush any buffered resampler tail.
    pipeline
        .finalize(&mut on_samples)
        .context("audio pipeline failed during finalize")
}

/// Probe the container and pick the first decodable track with a known sample rate.
fn probe_source_and_pick_default_track(
    source: Box<dyn MediaSource>,
    hint_extension: Option<&str>,
) -> Result<(Box<dyn FormatReader>, Track)> {
    let mss_opts = MediaSourceStreamOptions {
        // Symphonia expects a power-of-two buffer > 32KiB for good probing behavior.
        buffer_len: 256 * 1024,
    };

    let mss = MediaSourceStream::new(source, mss_opts);

    let mut hint = Hint::new();
    if let Some(ext) = hint_extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| anyhow!(e))
        .context("failed to probe media stream")?;

    let format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .cloned()
        .ok_or_else(|| anyhow!("no audio track found"))?;

    Ok((format, track))
}

fn make_decoder_for_track(track: &Track) -> Result<Box<dyn Decoder>> {
    symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| anyhow!(e))
        .context("failed to create decoder for audio track")
}

/// Read the next packet; `Ok(None)` means end of stream.
fn next_packet(format: &mut Box<dyn FormatReader>) -> Result<Option<Packet>> {
    match format.next_packet() {
        Ok(p) => Ok(Some(p)),
        Err(SymphoniaError::IoError(_)) => Ok(None),
        Err(e) => Err(anyhow!(e)).context("failed reading packet"),
    }
}

/// Decode a packet and hand the decoded buffer to `on_decoded`.
///
/// Corrupt frames are skipped and IO errors end the stream; anything else is fatal.
fn decode_packet_and_then(
    decoder: &mut Box<dyn Decoder>,
    packet: &Packet,
    mut on_decoded: impl FnMut(AudioBufferRef<'_>) -> Result<()>,
) -> Result<()> {
    match decoder.decode(packet) {
        Ok(buf) => on_decoded(buf),
        Err(SymphoniaError::DecodeError(e)) => {
            debug!(error = e, "skipping undecodable frame");
            Ok(())
        }
        Err(SymphoniaError::IoError(_)) => Ok(()),
        Err(e) => Err(anyhow!(e)).context("decoder failure"),
    }
}

struct LockedRead<R> {
    inner: Mutex<R>,
}

impl<R> LockedRead<R> {
    fn new(inner: R) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl<R: Read> Read for LockedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner
            .lock()
            .map_err(|_| std::io::Error::other("decoder input mutex poisoned"))?
            .read(buf)
    }
}
