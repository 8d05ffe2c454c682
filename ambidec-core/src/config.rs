//! Decoder configuration: order, channel ordering, normalization, weighting.
//!
//! All scheme selectors are closed enums validated when the configuration is
//! built, so an unknown identifier fails the offending reconfiguration
//! immediately instead of at first decode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AmbidecError, Result};

/// Ambisonic channel ordering convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrdering {
    /// Ambisonic Channel Number — canonical degree/order indexing.
    Acn,
    /// Furse-Malham (W, X, Y, Z) — legacy, first order at most.
    FuMa,
}

impl FromStr for ChannelOrdering {
    type Err = AmbidecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "acn" => Ok(Self::Acn),
            "fuma" => Ok(Self::FuMa),
            _ => Err(AmbidecError::UnknownIdentifier {
                kind: "channel ordering",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ChannelOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acn => write!(f, "ACN"),
            Self::FuMa => write!(f, "FuMa"),
        }
    }
}

/// Spherical-harmonic normalization convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Schmidt semi-normalized (the ambiX default).
    Sn3d,
}

impl FromStr for Normalization {
    type Err = AmbidecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sn3d" => Ok(Self::Sn3d),
            _ => Err(AmbidecError::UnknownIdentifier {
                kind: "normalization",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SN3D")
    }
}

/// Per-order gain taper applied to the ambisonic signal before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// No taper — all ambisonic channels at unit gain.
    Flat,
    /// Max-rE taper — higher orders attenuated to reduce ringing off-center.
    MaxRe,
}

impl FromStr for Weighting {
    type Err = AmbidecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "maxre" | "max-re" => Ok(Self::MaxRe),
            _ => Err(AmbidecError::UnknownIdentifier {
                kind: "weighting",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::MaxRe => write!(f, "maxRE"),
        }
    }
}

/// Validated decoder configuration.
///
/// Immutable once built — reconfiguring a decoder means constructing a new
/// `DecoderConfig` and rebuilding the decoding matrix from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    order: u32,
    ordering: ChannelOrdering,
    normalization: Normalization,
    weighting: Weighting,
}

impl DecoderConfig {
    /// Build and validate a configuration.
    ///
    /// # Errors
    /// `FumaUnsupportedOrder` when FuMa ordering is requested for N > 1.
    pub fn new(
        order: u32,
        ordering: ChannelOrdering,
        normalization: Normalization,
        weighting: Weighting,
    ) -> Result<Self> {
        if ordering == ChannelOrdering::FuMa && order > 1 {
            return Err(AmbidecError::FumaUnsupportedOrder(order));
        }
        Ok(Self {
            order,
            ordering,
            normalization,
            weighting,
        })
    }

    /// ACN/SN3D/flat configuration at the given order — the common default.
    pub fn acn(order: u32) -> Self {
        Self {
            order,
            ordering: ChannelOrdering::Acn,
            normalization: Normalization::Sn3d,
            weighting: Weighting::Flat,
        }
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn ordering(&self) -> ChannelOrdering {
        self.ordering
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    /// Number of ambisonic channels at this order: (N+1)².
    pub fn ambi_channels(&self) -> usize {
        let n = self.order as usize + 1;
        n * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuma_is_rejected_above_first_order() {
        for order in 0..=1 {
            assert!(DecoderConfig::new(
                order,
                ChannelOrdering::FuMa,
                Normalization::Sn3d,
                Weighting::Flat,
            )
            .is_ok());
        }
        assert!(matches!(
            DecoderConfig::new(
                2,
                ChannelOrdering::FuMa,
                Normalization::Sn3d,
                Weighting::Flat,
            ),
            Err(AmbidecError::FumaUnsupportedOrder(2))
        ));
    }

    #[test]
    fn ambi_channel_count_is_order_plus_one_squared() {
        assert_eq!(DecoderConfig::acn(0).ambi_channels(), 1);
        assert_eq!(DecoderConfig::acn(1).ambi_channels(), 4);
        assert_eq!(DecoderConfig::acn(3).ambi_channels(), 16);
    }

    #[test]
    fn unknown_identifiers_are_rejected_at_parse_time() {
        assert!("acn".parse::<ChannelOrdering>().is_ok());
        assert!("FuMa".parse::<ChannelOrdering>().is_ok());
        assert!(matches!(
            "ambix".parse::<ChannelOrdering>(),
            Err(AmbidecError::UnknownIdentifier { .. })
        ));

        assert!("sn3d".parse::<Normalization>().is_ok());
        assert!("n3d".parse::<Normalization>().is_err());

        assert!("flat".parse::<Weighting>().is_ok());
        assert!("maxre".parse::<Weighting>().is_ok());
        assert!("inphase".parse::<Weighting>().is_err());
    }
}
