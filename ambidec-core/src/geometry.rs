//! Loudspeaker geometry and mapping-file loading.
//!
//! A mapping file is a JSON document holding one or more named layouts:
//!
//! ```json
//! {
//!     "Octagon": {
//!         "0": { "azimuth": 0.0,  "elevation": 0.0 },
//!         "1": { "azimuth": 45.0, "elevation": 0.0 }
//!     }
//! }
//! ```
//!
//! Angles are degrees on disk and radians everywhere in the engine.

use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AmbidecError, Result};

/// One loudspeaker: output channel index plus direction in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loudspeaker {
    /// Output channel this feed is routed to.
    pub channel: usize,
    /// Azimuth in [0, 2π), counter-clockwise from front.
    pub azimuth: f64,
    /// Elevation in [-π/2, π/2], positive upward.
    pub elevation: f64,
}

/// A validated, non-empty, channel-ordered loudspeaker layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    speakers: Vec<Loudspeaker>,
}

impl Geometry {
    /// Build a geometry from loudspeaker entries.
    ///
    /// Azimuths are normalized into [0, 2π). An empty list, an elevation
    /// outside [-π/2, π/2], or a duplicate channel index is rejected.
    pub fn new(mut speakers: Vec<Loudspeaker>) -> Result<Self> {
        if speakers.is_empty() {
            return Err(AmbidecError::InvalidGeometry(
                "layout contains no loudspeakers".into(),
            ));
        }
        for s in &mut speakers {
            if !s.azimuth.is_finite() || !s.elevation.is_finite() {
                return Err(AmbidecError::InvalidGeometry(format!(
                    "non-finite angle on channel {}",
                    s.channel
                )));
            }
            if s.elevation < -FRAC_PI_2 - 1e-9 || s.elevation > FRAC_PI_2 + 1e-9 {
                return Err(AmbidecError::InvalidGeometry(format!(
                    "elevation {} out of [-π/2, π/2] on channel {}",
                    s.elevation, s.channel
                )));
            }
            s.azimuth = s.azimuth.rem_euclid(TAU);
        }
        let mut seen = std::collections::BTreeSet::new();
        for s in &speakers {
            if !seen.insert(s.channel) {
                return Err(AmbidecError::InvalidGeometry(format!(
                    "duplicate loudspeaker channel {}",
                    s.channel
                )));
            }
        }
        Ok(Self { speakers })
    }

    /// Load a named layout from a mapping file, converting degrees to radians.
    pub fn from_mapping_file(path: &Path, name: &str) -> Result<Self> {
        let doc: MappingDocument = serde_json::from_str(&fs::read_to_string(path)?)?;
        let layout = doc.0.get(name).ok_or_else(|| AmbidecError::LayoutNotFound {
            name: name.to_string(),
        })?;

        // BTreeMap keys sort lexicographically; order by numeric channel index.
        let mut speakers = Vec::with_capacity(layout.len());
        for (key, entry) in layout {
            let channel = key
                .parse::<usize>()
                .map_err(|_| AmbidecError::InvalidGeometry(format!("bad channel key {key:?}")))?;
            speakers.push(Loudspeaker {
                channel,
                azimuth: entry.azimuth.to_radians(),
                elevation: entry.elevation.to_radians(),
            });
        }
        speakers.sort_by_key(|s| s.channel);
        Self::new(speakers)
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    /// Always false — construction rejects empty layouts.
    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    pub fn speakers(&self) -> &[Loudspeaker] {
        &self.speakers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Loudspeaker> {
        self.speakers.iter()
    }

    /// True when every loudspeaker sits in the horizontal plane.
    pub fn is_horizontal(&self) -> bool {
        self.speakers.iter().all(|s| s.elevation.abs() < 1e-12)
    }
}

/// Layout names available in a mapping file, sorted by name.
pub fn mapping_names(path: &Path) -> Result<Vec<String>> {
    let doc: MappingDocument = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(doc.0.keys().cloned().collect())
}

#[derive(Debug, Deserialize)]
struct MappingDocument(BTreeMap<String, BTreeMap<String, MappingEntry>>);

#[derive(Debug, Deserialize)]
struct MappingEntry {
    azimuth: f64,
    elevation: f64,
}

/// A regular horizontal ring of `n` loudspeakers starting at front center.
///
/// Channels are assigned in ring order. Useful as a built-in default layout
/// and heavily used by the test suite.
pub fn horizontal_ring(n: usize) -> Result<Geometry> {
    let speakers = (0..n)
        .map(|i| Loudspeaker {
            channel: i,
            azimuth: TAU * i as f64 / n as f64,
            elevation: 0.0,
        })
        .collect();
    Geometry::new(speakers)
}

/// The eight corners of a cube: two elevated rings of four.
pub fn cube() -> Geometry {
    let elevation = (1.0f64 / 2.0f64.sqrt()).atan();
    let mut speakers = Vec::with_capacity(8);
    for (ring, el) in [(0usize, -elevation), (4usize, elevation)] {
        for i in 0..4 {
            speakers.push(Loudspeaker {
                channel: ring + i,
                azimuth: TAU * (2.0 * i as f64 + 1.0) / 8.0,
                elevation: el,
            });
        }
    }
    Geometry::new(speakers).expect("cube layout is always valid")
}
