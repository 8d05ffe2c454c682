//! Advisory reporting — warnings that never abort decoding.
//!
//! Decoders run on the real-time callback thread, so advisories are delivered
//! through a bounded channel with `try_send` (drop-on-full, never blocking)
//! and mirrored to the `tracing` log.

use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::warn;

/// A recoverable condition the caller should know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Clip carries more ambisonic channels than the decoder order uses.
    ExcessAmbisonicChannels { order: u32, clip_channels: usize },
    /// Clip carries more than the four first-order channels UHJ consumes.
    ExcessUhjChannels { clip_channels: usize },
    /// Device has fewer output channels than the geometry has loudspeakers.
    TruncatedOutputs {
        output_channels: usize,
        loudspeakers: usize,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcessAmbisonicChannels {
                order,
                clip_channels,
            } => write!(
                f,
                "clip has {clip_channels} channels, more than order N = {order} uses; \
                 decoding the leading channels only"
            ),
            Self::ExcessUhjChannels { clip_channels } => write!(
                f,
                "higher-order clip ({clip_channels} channels); UHJ uses the first-order \
                 channels only"
            ),
            Self::TruncatedOutputs {
                output_channels,
                loudspeakers,
            } => write!(
                f,
                "fewer output channels on device ({output_channels}) than loudspeakers in \
                 the mapping ({loudspeakers}); output will be truncated"
            ),
        }
    }
}

/// Cloneable advisory destination handed to decoders.
///
/// `report` always logs; when built with [`AdvisorySink::channel`] it also
/// forwards the advisory to the paired receiver for programmatic consumers
/// (the CLI transport loop, tests).
#[derive(Debug, Clone)]
pub struct AdvisorySink {
    tx: Option<Sender<Advisory>>,
}

impl AdvisorySink {
    /// A sink that only logs via `tracing::warn!`.
    pub fn log_only() -> Self {
        Self { tx: None }
    }

    /// A sink paired with a bounded receiver of capacity `cap`.
    pub fn channel(cap: usize) -> (Self, Receiver<Advisory>) {
        let (tx, rx) = bounded(cap);
        (Self { tx: Some(tx) }, rx)
    }

    /// Report an advisory. Never blocks; drops the message if the channel is
    /// full (the log line still fires).
    pub fn report(&self, advisory: Advisory) {
        warn!("{advisory}");
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(advisory);
        }
    }
}

impl Default for AdvisorySink {
    fn default() -> Self {
        Self::log_only()
    }
}
