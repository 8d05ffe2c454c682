//! Full spherical-harmonic decoder.
//!
//! Construction is the rebuild: `(output channels, config, geometry)` in,
//! decoding matrix out. A failed construction leaves the caller's previously
//! active decoder untouched, which is exactly the reconfiguration-error
//! policy — the offending change is dropped, playback keeps the old state.

use ndarray::{s, Array2, ArrayView2};

use super::truncate_channels;
use crate::advisory::{Advisory, AdvisorySink};
use crate::config::DecoderConfig;
use crate::error::{AmbidecError, Result};
use crate::geometry::Geometry;
use crate::matrix::DecodingMatrix;

/// Ambisonic-to-loudspeaker decoder.
#[derive(Debug, Clone)]
pub struct AmbisonicDecoder {
    n_output_channels: usize,
    config: DecoderConfig,
    geometry: Geometry,
    matrix: DecodingMatrix,
    sink: AdvisorySink,
    /// A mismatched clip stays mismatched every block; warn once, not at
    /// block rate on the callback thread. Rebuilding the decoder resets it.
    excess_reported: bool,
}

impl AmbisonicDecoder {
    /// Build a decoder, rebuilding the decoding matrix from scratch.
    ///
    /// Emits a `TruncatedOutputs` advisory when the device offers fewer
    /// output channels than the geometry has loudspeakers; the surplus
    /// feeds are dropped at decode time.
    ///
    /// # Errors
    /// Configuration errors from `DecodingMatrix::build` (e.g. FuMa above
    /// first order).
    pub fn new(
        n_output_channels: usize,
        config: DecoderConfig,
        geometry: Geometry,
        sink: AdvisorySink,
    ) -> Result<Self> {
        let matrix = DecodingMatrix::build(&config, &geometry)?;
        if n_output_channels < geometry.len() {
            sink.report(Advisory::TruncatedOutputs {
                output_channels: n_output_channels,
                loudspeakers: geometry.len(),
            });
        }
        Ok(Self {
            n_output_channels,
            config,
            geometry,
            matrix,
            sink,
            excess_reported: false,
        })
    }

    pub fn output_channels(&self) -> usize {
        self.n_output_channels
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn matrix(&self) -> &DecodingMatrix {
        &self.matrix
    }

    /// Decode one ambisonic block into loudspeaker feeds.
    ///
    /// More source channels than `(N+1)²` is advisory (leading channels
    /// used, reported once per decoder); fewer is an `InsufficientChannels`
    /// error and the decoder is left unchanged.
    pub fn decode(&mut self, block: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let needed = self.matrix.ambi_channels();
        let got = block.ncols();

        if got < needed {
            return Err(AmbidecError::InsufficientChannels { needed, got });
        }
        let block = if got > needed {
            if !self.excess_reported {
                self.excess_reported = true;
                self.sink.report(Advisory::ExcessAmbisonicChannels {
                    order: self.config.order(),
                    clip_channels: got,
                });
            }
            block.slice_move(s![.., ..needed])
        } else {
            block
        };

        // Per-channel taper, then the matrix collapse to one feed per speaker
        let weighted = &block * self.matrix.weights();
        let feeds = weighted.dot(self.matrix.matrix());

        Ok(truncate_channels(feeds.view(), self.n_output_channels))
    }
}
