//! Decoder variants — one capability, "decode one audio block".
//!
//! A closed set of tagged variants rather than an inheritance chain: each
//! variant carries only the state it needs, and the channel-count truncation
//! every variant ends with is the shared [`truncate_channels`] helper instead
//! of a base-class call-through.
//!
//! Decoders are built complete on the control thread (matrix and all) and
//! handed to the playback callback whole, so `decode` never observes a
//! half-reconfigured state.

pub mod ambisonic;
pub mod raw;
pub mod uhj;

pub use ambisonic::AmbisonicDecoder;
pub use raw::RawDecoder;
pub use uhj::UhjDecoder;

use ndarray::{s, Array2, ArrayView2};

use crate::error::Result;

/// The active decoder: one of the closed set of variants.
#[derive(Debug)]
pub enum Decoder {
    /// Pass-through: leading channels straight to the device.
    Raw(RawDecoder),
    /// First-order B-format to stereo via frequency-domain UHJ matrixing.
    Uhj(UhjDecoder),
    /// Spherical-harmonic decode to a loudspeaker layout.
    Ambisonic(AmbisonicDecoder),
}

impl Decoder {
    /// Decode one block (frames × channels) into output feeds.
    ///
    /// Runs on the real-time callback thread; advisory conditions are
    /// reported through the decoder's sink and never abort the block.
    pub fn decode(&mut self, block: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        match self {
            Self::Raw(d) => Ok(d.decode(block)),
            Self::Uhj(d) => d.decode(block),
            Self::Ambisonic(d) => d.decode(block),
        }
    }

    /// The configured output channel count (the decode result may have fewer
    /// columns when the source cannot fill them — see `RawDecoder`).
    pub fn output_channels(&self) -> usize {
        match self {
            Self::Raw(d) => d.output_channels(),
            Self::Uhj(d) => d.output_channels(),
            Self::Ambisonic(d) => d.output_channels(),
        }
    }
}

impl From<RawDecoder> for Decoder {
    fn from(d: RawDecoder) -> Self {
        Self::Raw(d)
    }
}

impl From<UhjDecoder> for Decoder {
    fn from(d: UhjDecoder) -> Self {
        Self::Uhj(d)
    }
}

impl From<AmbisonicDecoder> for Decoder {
    fn from(d: AmbisonicDecoder) -> Self {
        Self::Ambisonic(d)
    }
}

/// Keep at most the first `k` channels of a block.
///
/// When the block has fewer than `k` channels the result simply has fewer
/// columns — callers must not assume exactly `k` columns back.
pub fn truncate_channels(block: ArrayView2<'_, f64>, k: usize) -> Array2<f64> {
    let cols = block.ncols().min(k);
    block.slice(s![.., ..cols]).to_owned()
}
