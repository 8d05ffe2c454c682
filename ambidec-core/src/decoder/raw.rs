//! Raw pass-through decoder.

use ndarray::{Array2, ArrayView2};

use super::truncate_channels;

/// Routes the leading source channels straight to the output.
///
/// No validation against the source channel count: a block with fewer
/// channels than configured comes back with fewer columns. This is a
/// documented ambiguity, not a defect — the driver zero-fills whatever the
/// decode did not cover.
#[derive(Debug, Clone)]
pub struct RawDecoder {
    n_output_channels: usize,
}

impl RawDecoder {
    pub fn new(n_output_channels: usize) -> Self {
        Self { n_output_channels }
    }

    pub fn output_channels(&self) -> usize {
        self.n_output_channels
    }

    pub fn decode(&self, block: ArrayView2<'_, f64>) -> Array2<f64> {
        truncate_channels(block, self.n_output_channels)
    }
}
