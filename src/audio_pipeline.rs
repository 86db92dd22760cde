//! Audio normalization for autocut.
//!
//! Responsibilities:
//! - Convert Symphonia-decoded PCM into interleaved `f32`
//! - Downmix to mono
//! - Resample to the 16 kHz analysis rate (when needed)
//!
//! `finalize()` must be called at end-of-stream to flush the resampler tail. The total output
//! length is `round(source_frames * 16000 / source_rate)`; leading filter delay is trimmed so
//! sample indices line up with the source timeline.

use anyhow::{Context, Result, anyhow, bail};
use audioadapter_buffers::direct::SequentialSliceOfVecs;
use rubato::{Async, FixedAsync, PolynomialDegree, Resampler};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};

/// Mono sample rate (Hz) every downstream stage assumes.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Source frames fed to the resampler per `process` call.
const RESAMPLER_CHUNK_FRAMES: usize = 1024;

/// Upper bound on zero-padded blocks pushed while draining the resampler.
const MAX_FLUSH_BLOCKS: usize = 16;

struct Resampling {
    rs: Async<f32>,
    src_rate: u32,
    /// Leading output frames still to discard.
    skip: usize,
    /// Real (unpadded) source frames pushed so far.
    src_frames: usize,
    /// Output frames handed to the caller so far.
    emitted: usize,
}

impl Resampling {
    fn expected_frames(&self) -> usize {
        (self.src_frames as f64 * TARGET_SAMPLE_RATE as f64 / self.src_rate as f64).round() as usize
    }

    fn drained(&self) -> bool {
        self.emitted >= self.expected_frames()
    }

    /// Trim filter delay from the front and padding overshoot from the back.
    fn take_output<'a>(&mut self, out: &'a [f32]) -> &'a [f32] {
        let skip = self.skip.min(out.len());
        self.skip -= skip;
        let out = &out[skip..];

        let remaining = self.expected_frames().saturating_sub(self.emitted);
        let out = &out[..out.len().min(remaining)];
        self.emitted += out.len();
        out
    }
}

/// A small stateful pipeline that converts decoded audio into mono 16 kHz `f32`.
#[derive(Default)]
pub struct AudioPipeline {
    // Scratch buffer used to copy decoded PCM into an interleaved `Vec<f32>`.
    sample_buf_f32: Option<SampleBuffer<f32>>,

    // Lazily initialized resampler (only needed when the source sample rate != 16 kHz).
    resampler: Option<Resampling>,

    // Rate of the first buffer seen; later buffers must match.
    src_rate: Option<u32>,

    // Accumulator for mono source samples before feeding full blocks into rubato.
    mono_src_acc: Vec<f32>,
}

impl AudioPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a decoded Symphonia buffer through the pipeline and emit 16 kHz mono samples.
    pub fn push_decoded(
        &mut self,
        decoded: &AudioBufferRef<'_>,
        emit: &mut impl FnMut(&[f32]) -> Result<()>,
    ) -> Result<()> {
        let (interleaved, src_rate, channels) =
            decoded_to_interleaved_f32(decoded, &mut self.sample_buf_f32)?;

        let mono_src = downmix_to_mono(&interleaved, channels);
        self.push_mono(&mono_src, src_rate, emit)
    }

    /// Push mono samples at `src_rate` and emit whatever 16 kHz output is ready.
    pub fn push_mono(
        &mut self,
        mono_src: &[f32],
        src_rate: u32,
        emit: &mut impl FnMut(&[f32]) -> Result<()>,
    ) -> Result<()> {
        if src_rate == 0 {
            bail!("decoded audio reported a sample rate of 0 Hz");
        }

        match self.src_rate {
            None => self.src_rate = Some(src_rate),
            Some(rate) if rate != src_rate => {
                bail!("sample rate changed mid-stream ({rate} Hz -> {src_rate} Hz)")
            }
            Some(_) => {}
        }

        // Fast path: already at the target sample rate.
        if src_rate == TARGET_SAMPLE_RATE {
            if !mono_src.is_empty() {
                emit(mono_src)?;
            }
            return Ok(());
        }

        self.ensure_resampler(src_rate)?;
        if let Some(state) = self.resampler.as_mut() {
            state.src_frames += mono_src.len();
        }
        self.mono_src_acc.extend_from_slice(mono_src);

        while self.mono_src_acc.len() >= RESAMPLER_CHUNK_FRAMES {
            let block: Vec<f32> = self.mono_src_acc.drain(..RESAMPLER_CHUNK_FRAMES).collect();
            self.resample_block(block, emit)?;
        }

        Ok(())
    }

    /// Flush remaining buffered samples at end-of-stream.
    ///
    /// If resampling was never needed, this is a no-op.
    pub fn finalize(&mut self, emit: &mut impl FnMut(&[f32]) -> Result<()>) -> Result<()> {
        let mut blocks = 0;

        loop {
            let Some(state) = self.resampler.as_ref() else {
                return Ok(());
            };
            if self.mono_src_acc.is_empty() && state.drained() {
                return Ok(());
            }

            blocks += 1;
            if blocks > MAX_FLUSH_BLOCKS {
                bail!("resampler did not drain after {MAX_FLUSH_BLOCKS} padded blocks");
            }

            // rubato expects exact block sizes; pad the remainder with zeros.
            let take = self.mono_src_acc.len().min(RESAMPLER_CHUNK_FRAMES);
            let mut block: Vec<f32> = self.mono_src_acc.drain(..take).collect();
            block.resize(RESAMPLER_CHUNK_FRAMES, 0.0);

            self.resample_block(block, emit)?;
        }
    }

    fn ensure_resampler(&mut self, src_rate: u32) -> Result<()> {
        if self.resampler.is_some() {
            return Ok(());
        }

        let rs = Async::<f32>::new_poly(
            TARGET_SAMPLE_RATE as f64 / src_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            RESAMPLER_CHUNK_FRAMES,
            1, // mono
            FixedAsync::Input,
        )
        .map_err(|e| anyhow!(e))
        .context("failed to init resampler")?;

        let skip = rs.output_delay();
        self.resampler = Some(Resampling {
            rs,
            src_rate,
            skip,
            src_frames: 0,
            emitted: 0,
        });
        Ok(())
    }

    fn resample_block(
        &mut self,
        block: Vec<f32>,
        emit: &mut impl FnMut(&[f32]) -> Result<()>,
    ) -> Result<()> {
        let state = self
            .resampler
            .as_mut()
            .ok_or_else(|| anyhow!("resampler not initialized"))?;

        let input = vec![block];
        let input_adapter = SequentialSliceOfVecs::new(&input, 1, RESAMPLER_CHUNK_FRAMES)
            .map_err(|e| anyhow!("invalid resampler input buffer: {e:?}"))?;

        let max_out = state.rs.output_frames_max();
        let mut output = vec![vec![0.0f32; max_out]; 1];
        let written = {
            let mut output_adapter = SequentialSliceOfVecs::new_mut(&mut output, 1, max_out)
                .map_err(|e| anyhow!("invalid resampler output buffer: {e:?}"))?;
            let (_, written) = state
                .rs
                .process_into_buffer(&input_adapter, &mut output_adapter, None)
                .map_err(|e| anyhow!(e))
                .context("resampler process failed")?;
            written
        };

        let out = state.take_output(&output[0][..written]);
        if !out.is_empty() {
            emit(out)?;
        }
        Ok(())
    }
}

fn decoded_to_interleaved_f32(
    decoded: &AudioBufferRef<'_>,
    sample_buf_f32: &mut Option<SampleBuffer<f32>>,
) -> Result<(Vec<f32>, u32, usize)> {
    let src_rate = decoded.spec().rate;
    let channels = decoded.spec().channels.count();
    if channels == 0 {
        bail!("decoded audio had zero channels");
    }

    // Packets can grow (e.g. variable frame sizes); reallocate when the scratch is too small.
    let needed = decoded.capacity() * channels;
    if sample_buf_f32
        .as_ref()
        .is_none_or(|buf| buf.capacity() < needed)
    {
        *sample_buf_f32 = Some(SampleBuffer::<f32>::new(
            decoded.capacity() as u64,
            *decoded.spec(),
        ));
    }

    let buf = sample_buf_f32
        .as_mut()
        .ok_or_else(|| anyhow!("sample buffer not initialized"))?;

    // Copy decoded PCM into our interleaved scratch buffer.
    buf.copy_interleaved_ref(decoded.clone());

    Ok((buf.samples().to_vec(), src_rate, channels))
}

/// Downmix interleaved samples into mono by averaging channels.
fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(pipeline: &mut AudioPipeline, mono: &[f32], rate: u32) -> anyhow::Result<Vec<f32>> {
        let mut out = Vec::new();
        let mut emit = |chunk: &[f32]| -> anyhow::Result<()> {
            out.extend_from_slice(chunk);
            Ok(())
        };
        pipeline.push_mono(mono, rate, &mut emit)?;
        pipeline.finalize(&mut emit)?;
        Ok(out)
    }

    #[test]
    fn finalize_is_noop_without_resampler() -> anyhow::Result<()> {
        let mut pipeline = AudioPipeline::new();
        pipeline.finalize(&mut |_| Ok(()))?;
        Ok(())
    }

    #[test]
    fn downmix_to_mono_single_channel_is_identity() {
        let input = vec![0.0, 1.0, -1.0];
        assert_eq!(downmix_to_mono(&input, 1), input);
    }

    #[test]
    fn downmix_to_mono_averages_channels() {
        // Two frames of stereo: (L=1, R=3), (L=-1, R=1) => mono: 2, 0
        let interleaved = vec![1.0, 3.0, -1.0, 1.0];
        assert_eq!(downmix_to_mono(&interleaved, 2), vec![2.0, 0.0]);
    }

    #[test]
    fn target_rate_passes_through_untouched() -> anyhow::Result<()> {
        let mut pipeline = AudioPipeline::new();
        let input: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        assert_eq!(run(&mut pipeline, &input, TARGET_SAMPLE_RATE)?, input);
        Ok(())
    }

    #[test]
    fn resampling_produces_the_scaled_length() -> anyhow::Result<()> {
        let mut pipeline = AudioPipeline::new();
        let out = run(&mut pipeline, &vec![0.0; 8_000 + 7], 8_000)?;
        assert_eq!(out.len(), 16_014);

        let mut pipeline = AudioPipeline::new();
        let out = run(&mut pipeline, &vec![0.0; 48_000], 48_000)?;
        assert_eq!(out.len(), 16_000);
        Ok(())
    }

    #[test]
    fn sample_rate_change_is_rejected() -> anyhow::Result<()> {
        let mut pipeline = AudioPipeline::new();
        pipeline.push_mono(&[0.0; 10], 16_000, &mut |_| Ok(()))?;
        let err = pipeline
            .push_mono(&[0.0; 10], 44_100, &mut |_| Ok(()))
            .unwrap_err();
        assert!(err.to_string().contains("sample rate changed"));
        Ok(())
    }

    #[test]
    fn resample_block_errors_when_resampler_is_missing() {
        let mut pipeline = AudioPipeline::new();
        let err = pipeline
            .resample_block(vec![0.0; RESAMPLER_CHUNK_FRAMES], &mut |_| Ok(()))
            .unwrap_err();
        assert!(err.to_string().contains("resampler not initialized"));
    }
}
