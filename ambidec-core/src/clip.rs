//! In-memory audio clip: the frames × channels sample matrix the driver reads.

use std::path::Path;

use ndarray::{s, Array2, ArrayView2};

use crate::error::{AmbidecError, Result};

/// A whole audio clip held in memory.
///
/// Samples are stored frames × channels, nominal amplitude in [-1, 1].
/// The playback driver only ever reads contiguous frame ranges; the clip is
/// never mutated after loading.
#[derive(Debug, Clone)]
pub struct AudioClip {
    samples: Array2<f64>,
    sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Array2<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Load a WAV file into a frames × channels matrix.
    ///
    /// Integer sample formats are normalized to [-1, 1]; float WAVs are taken
    /// as-is. Interleaved frames are de-interleaved into matrix rows.
    pub fn from_wav_path(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(f64::from))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = ((1_i64 << (spec.bits_per_sample - 1)) - 1) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / max))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        let frames = interleaved.len() / channels;
        let samples = Array2::from_shape_vec((frames, channels), interleaved)
            .map_err(|e| AmbidecError::UnsupportedClip(e.to_string()))?;

        Ok(Self::new(samples, spec.sample_rate))
    }

    pub fn frames(&self) -> usize {
        self.samples.nrows()
    }

    pub fn channels(&self) -> usize {
        self.samples.ncols()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// A contiguous block of frames `[start, start + len)`.
    ///
    /// Clamped to the clip end, so the final block of a clip may be shorter
    /// than requested.
    pub fn block(&self, start: usize, len: usize) -> ArrayView2<'_, f64> {
        let start = start.min(self.frames());
        let end = (start + len).min(self.frames());
        self.samples.slice(s![start..end, ..])
    }
}

/// Highest complete ambisonic order representable with `channels` channels.
///
/// A clip with `(N+1)²` or more channels carries all of order N. Returns
/// `None` when there is not even a zeroth-order (W) channel.
pub fn max_order(channels: usize) -> Option<u32> {
    if channels == 0 {
        return None;
    }
    Some(channels.isqrt() as u32 - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ramp_clip(frames: usize, channels: usize) -> AudioClip {
        let samples =
            Array2::from_shape_fn((frames, channels), |(f, c)| f as f64 + c as f64 / 10.0);
        AudioClip::new(samples, 48_000)
    }

    #[test]
    fn block_is_clamped_at_clip_end() {
        let clip = ramp_clip(10, 4);
        let block = clip.block(8, 4);
        assert_eq!(block.nrows(), 2);
        assert_eq!(block.ncols(), 4);
        assert_eq!(block[[0, 0]], 8.0);
    }

    #[test]
    fn block_past_end_is_empty() {
        let clip = ramp_clip(10, 4);
        assert_eq!(clip.block(10, 4).nrows(), 0);
        assert_eq!(clip.block(100, 4).nrows(), 0);
    }

    #[test]
    fn max_order_from_channel_count() {
        assert_eq!(max_order(0), None);
        assert_eq!(max_order(1), Some(0));
        assert_eq!(max_order(3), Some(0));
        assert_eq!(max_order(4), Some(1));
        assert_eq!(max_order(8), Some(1));
        assert_eq!(max_order(9), Some(2));
        assert_eq!(max_order(16), Some(3));
        assert_eq!(max_order(25), Some(4));
    }

    #[test]
    fn duration_reflects_sample_rate() {
        let clip = ramp_clip(48_000, 2);
        assert!((clip.duration_secs() - 1.0).abs() < 1e-12);
    }
}
