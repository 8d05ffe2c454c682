//! Per-block rendering: the decode work the output callback performs.
//!
//! Factored out of the cpal closure so the block semantics (cursor advance,
//! tail zero-fill, decode-failure silence) are testable without a device.

use std::sync::Arc;

use tracing::error;

use crate::clip::AudioClip;
use crate::decoder::Decoder;

/// Outcome of rendering one hardware block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOutcome {
    /// Source frames consumed (may be fewer than the block on the last
    /// block of the clip).
    pub frames_consumed: usize,
    /// True when the clip is exhausted and the remainder was zero-filled.
    pub end_of_clip: bool,
}

/// Owns the decoder and source clip on behalf of the callback thread.
pub struct BlockRenderer {
    clip: Arc<AudioClip>,
    decoder: Decoder,
    output_channels: usize,
}

impl BlockRenderer {
    pub fn new(clip: Arc<AudioClip>, decoder: Decoder, output_channels: usize) -> Self {
        Self {
            clip,
            decoder,
            output_channels,
        }
    }

    /// Replace the decoder wholesale — the atomic publication point for a
    /// reconfiguration built on the control thread.
    pub fn set_decoder(&mut self, decoder: Decoder) {
        self.decoder = decoder;
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Decode the block starting at `start` into `out`, an interleaved
    /// buffer of `frames × output_channels` samples.
    ///
    /// Channels the decode does not cover, the clip tail, and any block a
    /// decode error leaves behind are zero-filled; a decode error is logged
    /// and never propagates to the audio thread.
    pub fn render(&mut self, start: usize, out: &mut [f32]) -> BlockOutcome {
        let channels = self.output_channels;
        let frames = out.len() / channels;
        out.fill(0.0);

        let block = self.clip.block(start, frames);
        let chunk = block.nrows();
        if chunk == 0 {
            return BlockOutcome {
                frames_consumed: 0,
                end_of_clip: true,
            };
        }

        match self.decoder.decode(block) {
            Ok(decoded) => {
                let cols = decoded.ncols().min(channels);
                for f in 0..decoded.nrows() {
                    let base = f * channels;
                    for c in 0..cols {
                        out[base + c] = decoded[[f, c]] as f32;
                    }
                }
            }
            Err(e) => {
                // Keep the stream alive; the block stays silent.
                error!("decode failed, emitting silence: {e}");
            }
        }

        BlockOutcome {
            frames_consumed: chunk,
            end_of_clip: chunk < frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::RawDecoder;
    use ndarray::Array2;

    fn ramp_clip(frames: usize, channels: usize) -> Arc<AudioClip> {
        Arc::new(AudioClip::new(
            Array2::from_shape_fn((frames, channels), |(f, c)| f as f64 + c as f64 * 0.01),
            48_000,
        ))
    }

    #[test]
    fn full_block_consumes_all_frames() {
        let mut r = BlockRenderer::new(ramp_clip(64, 2), RawDecoder::new(2).into(), 2);
        let mut out = vec![1.0f32; 16 * 2];
        let outcome = r.render(0, &mut out);
        assert_eq!(
            outcome,
            BlockOutcome {
                frames_consumed: 16,
                end_of_clip: false,
            }
        );
        assert_eq!(out[0], 0.0);
        assert_eq!(out[2], 1.0);
        assert!((out[3] - 1.01).abs() < 1e-6);
    }

    #[test]
    fn last_block_zero_fills_the_tail() {
        let mut r = BlockRenderer::new(ramp_clip(10, 2), RawDecoder::new(2).into(), 2);
        let mut out = vec![1.0f32; 8 * 2];
        let outcome = r.render(6, &mut out);
        assert_eq!(outcome.frames_consumed, 4);
        assert!(outcome.end_of_clip);
        // Frames 4..8 of the block are silence
        assert!(out[8..].iter().all(|&s| s == 0.0));
        assert_eq!(out[0], 6.0);
    }

    #[test]
    fn exhausted_clip_renders_silence() {
        let mut r = BlockRenderer::new(ramp_clip(10, 2), RawDecoder::new(2).into(), 2);
        let mut out = vec![1.0f32; 8];
        let outcome = r.render(10, &mut out);
        assert_eq!(outcome.frames_consumed, 0);
        assert!(outcome.end_of_clip);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn narrow_decode_leaves_extra_device_channels_silent() {
        // Clip has 2 channels, device has 4: columns 2..4 stay zero.
        let mut r = BlockRenderer::new(ramp_clip(32, 2), RawDecoder::new(4).into(), 4);
        let mut out = vec![1.0f32; 8 * 4];
        r.render(4, &mut out);
        for f in 0..8 {
            assert!(out[f * 4] != 0.0);
            assert_eq!(out[f * 4 + 2], 0.0);
            assert_eq!(out[f * 4 + 3], 0.0);
        }
    }

    #[test]
    fn decode_error_emits_silence_but_advances() {
        use crate::advisory::AdvisorySink;
        use crate::config::ChannelOrdering;
        use crate::decoder::UhjDecoder;

        // UHJ needs 4 channels; this clip has 2, so every decode errors.
        let decoder =
            UhjDecoder::new(2, ChannelOrdering::Acn, AdvisorySink::log_only()).into();
        let mut r = BlockRenderer::new(ramp_clip(32, 2), decoder, 2);
        let mut out = vec![1.0f32; 8 * 2];
        let outcome = r.render(0, &mut out);
        assert_eq!(outcome.frames_consumed, 8);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn decoder_swap_takes_effect_next_block() {
        let mut r = BlockRenderer::new(ramp_clip(64, 4), RawDecoder::new(1).into(), 4);
        let mut out = vec![0.0f32; 4 * 4];
        r.render(0, &mut out);
        assert_eq!(out[1], 0.0); // only channel 0 fed

        r.set_decoder(RawDecoder::new(4).into());
        r.render(4, &mut out);
        assert!(out[1] != 0.0);
    }
}
