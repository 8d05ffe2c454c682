//! UHJ stereo decoder — first-order B-format to a two-channel feed.
//!
//! The shelf filtering is applied in the frequency domain with one DFT per
//! block and no overlap-add; spectral leakage at block boundaries is an
//! accepted limitation of this design, not something this decoder corrects.

use ndarray::{Array2, ArrayView2};
use rustfft::{num_complex::Complex, FftPlanner};

use super::truncate_channels;
use crate::advisory::{Advisory, AdvisorySink};
use crate::config::ChannelOrdering;
use crate::error::{AmbidecError, Result};

/// B-format channels consumed by the UHJ matrix.
const B_FORMAT_CHANNELS: usize = 4;

// Fixed shelf coefficients of the stereo UHJ encoding equations.
const S_W: f64 = 0.939_692_6;
const S_X: f64 = 0.185_574_0;
const D_W: f64 = -0.342_020_1;
const D_X: f64 = 0.509_860_4;
const D_Y: f64 = 0.655_451_6;

/// Frequency-domain B-format → stereo decoder.
pub struct UhjDecoder {
    n_output_channels: usize,
    ordering: ChannelOrdering,
    /// Plans are cached per block length, so steady-state playback with a
    /// fixed device block size plans exactly twice.
    planner: FftPlanner<f64>,
    sink: AdvisorySink,
    /// A mismatched clip stays mismatched every block; warn once, not at
    /// block rate on the callback thread.
    excess_reported: bool,
}

impl std::fmt::Debug for UhjDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UhjDecoder")
            .field("n_output_channels", &self.n_output_channels)
            .field("ordering", &self.ordering)
            .finish_non_exhaustive()
    }
}

impl UhjDecoder {
    pub fn new(n_output_channels: usize, ordering: ChannelOrdering, sink: AdvisorySink) -> Self {
        Self {
            n_output_channels,
            ordering,
            planner: FftPlanner::new(),
            sink,
            excess_reported: false,
        }
    }

    pub fn output_channels(&self) -> usize {
        self.n_output_channels
    }

    /// Decode one B-format block into stereo.
    ///
    /// Higher-order input is advisory (first-order channels used, reported
    /// once per decoder).
    ///
    /// # Errors
    /// `InsufficientChannels` when the block has fewer than four channels.
    pub fn decode(&mut self, block: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let channels = block.ncols();
        if channels < B_FORMAT_CHANNELS {
            return Err(AmbidecError::InsufficientChannels {
                needed: B_FORMAT_CHANNELS,
                got: channels,
            });
        }
        if channels > B_FORMAT_CHANNELS && !self.excess_reported {
            self.excess_reported = true;
            self.sink.report(Advisory::ExcessUhjChannels {
                clip_channels: channels,
            });
        }

        let frames = block.nrows();
        if frames == 0 {
            return Ok(Array2::zeros((0, self.n_output_channels.min(2))));
        }

        // W/X/Y column positions; the vertical component is discarded.
        let (wi, xi, yi) = match self.ordering {
            ChannelOrdering::Acn => (0, 3, 1),
            ChannelOrdering::FuMa => (0, 1, 2),
        };

        let fft = self.planner.plan_fft_forward(frames);
        let mut w = spectrum(block, wi);
        let mut x = spectrum(block, xi);
        let mut y = spectrum(block, yi);
        fft.process(&mut w);
        fft.process(&mut x);
        fft.process(&mut y);

        // Sum/difference shelving, then back to the time domain.
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for k in 0..frames {
            let s = S_W * w[k] + S_X * x[k];
            let d = Complex::<f64>::i() * (D_W * w[k] + D_X * x[k]) + D_Y * y[k];
            left.push((s + d) * 0.5);
            right.push((s - d) * 0.5);
        }

        let ifft = self.planner.plan_fft_inverse(frames);
        ifft.process(&mut left);
        ifft.process(&mut right);

        // rustfft leaves the inverse unnormalized
        let scale = 1.0 / frames as f64;
        let mut stereo = Array2::zeros((frames, 2));
        for k in 0..frames {
            stereo[[k, 0]] = left[k].re * scale;
            stereo[[k, 1]] = right[k].re * scale;
        }

        Ok(truncate_channels(stereo.view(), self.n_output_channels))
    }
}

fn spectrum(block: ArrayView2<'_, f64>, column: usize) -> Vec<Complex<f64>> {
    block
        .column(column)
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::AdvisorySink;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn decoder(outputs: usize) -> UhjDecoder {
        UhjDecoder::new(outputs, ChannelOrdering::Acn, AdvisorySink::log_only())
    }

    #[test]
    fn higher_order_input_warns_and_yields_stereo() {
        let (sink, rx) = AdvisorySink::channel(4);
        let mut dec = UhjDecoder::new(2, ChannelOrdering::Acn, sink);
        let block = Array2::from_shape_fn((64, 9), |(f, _)| (f as f64 * 0.1).sin());
        let out = dec.decode(block.view()).unwrap();
        assert_eq!(out.ncols(), 2);
        assert_eq!(out.nrows(), 64);
        assert_eq!(
            rx.try_recv().unwrap(),
            Advisory::ExcessUhjChannels { clip_channels: 9 }
        );
    }

    #[test]
    fn excess_advisory_is_latched_after_the_first_block() {
        // Steady-state playback of a mismatched clip must not warn at block
        // rate from the callback thread.
        let (sink, rx) = AdvisorySink::channel(64);
        let mut dec = UhjDecoder::new(2, ChannelOrdering::Acn, sink);
        let block = Array2::from_shape_fn((64, 9), |(f, _)| (f as f64 * 0.1).sin());
        for _ in 0..50 {
            dec.decode(block.view()).unwrap();
        }
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn four_channel_input_is_silent_about_truncation() {
        let (sink, rx) = AdvisorySink::channel(4);
        let mut dec = UhjDecoder::new(2, ChannelOrdering::Acn, sink);
        let block = Array2::zeros((32, 4));
        dec.decode(block.view()).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn too_few_channels_is_an_error() {
        let mut dec = decoder(2);
        let block = Array2::zeros((32, 2));
        assert!(matches!(
            dec.decode(block.view()),
            Err(AmbidecError::InsufficientChannels { needed: 4, got: 2 })
        ));
    }

    #[test]
    fn omnidirectional_source_lands_center() {
        // W-only content has no X/Y: both channels get 0.9396926 · W / 2
        let mut dec = decoder(2);
        let mut block = Array2::zeros((128, 4));
        for f in 0..128 {
            block[[f, 0]] = (f as f64 * 0.2).cos();
        }
        let out = dec.decode(block.view()).unwrap();
        for f in 0..128 {
            let expected = S_W * block[[f, 0]] / 2.0;
            assert_abs_diff_eq!(out[[f, 0]], expected, epsilon = 1e-9);
            assert_abs_diff_eq!(out[[f, 1]], expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn y_component_separates_left_from_right() {
        // Pure Y (left-pointing first-order component) adds to L, subtracts
        // from R; with zero W/X the channels are mirror images.
        let mut dec = decoder(2);
        let mut block = Array2::zeros((64, 4));
        for f in 0..64 {
            block[[f, 1]] = (f as f64 * 0.3).sin(); // ACN 1 = Y
        }
        let out = dec.decode(block.view()).unwrap();
        for f in 0..64 {
            assert_abs_diff_eq!(out[[f, 0]], -out[[f, 1]], epsilon = 1e-9);
            assert_abs_diff_eq!(out[[f, 0]], D_Y * block[[f, 1]] / 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn single_output_channel_truncates_stereo() {
        let mut dec = decoder(1);
        let block = Array2::from_shape_fn((16, 4), |(f, c)| (f + c) as f64 * 1e-3);
        let out = dec.decode(block.view()).unwrap();
        assert_eq!(out.ncols(), 1);
    }

    #[test]
    fn empty_block_decodes_to_empty() {
        let mut dec = decoder(2);
        let block = Array2::zeros((0, 4));
        let out = dec.decode(block.view()).unwrap();
        assert_eq!(out.nrows(), 0);
        assert_eq!(out.ncols(), 2);
    }
}
