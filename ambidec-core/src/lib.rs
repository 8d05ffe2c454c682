//! # ambidec-core
//!
//! Reusable ambisonic decoding engine SDK.
//!
//! ## Architecture
//!
//! ```text
//! AudioClip ──► Player callback ──► Decoder::decode(block) ──► device buffer
//!                    ▲                      │
//!          swap channel (control thread)    └─► AdvisorySink (warnings)
//!                    │
//!          DecodingMatrix::build(config, geometry)   [off the RT thread]
//! ```
//!
//! The output callback owns its `Decoder` exclusively. Reconfiguration builds
//! a brand-new decoder (matrix fully rebuilt) on the control thread and hands
//! it over through a channel, so the callback only ever observes a
//! complete `(config, geometry, matrix)` tuple.

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod advisory;
pub mod clip;
pub mod config;
pub mod decoder;
pub mod error;
pub mod geometry;
pub mod matrix;
pub mod playback;

// Convenience re-exports for downstream crates
pub use advisory::{Advisory, AdvisorySink};
pub use clip::AudioClip;
pub use config::{ChannelOrdering, DecoderConfig, Normalization, Weighting};
pub use decoder::{AmbisonicDecoder, Decoder, RawDecoder, UhjDecoder};
pub use error::AmbidecError;
pub use geometry::{Geometry, Loudspeaker};
pub use matrix::DecodingMatrix;
pub use playback::{PlaybackState, Player};
