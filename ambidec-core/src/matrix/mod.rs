//! Decoding-matrix construction.
//!
//! `DecodingMatrix::build` is a pure function of `(DecoderConfig, Geometry)`.
//! It runs on the control thread; the playback callback only ever receives a
//! finished matrix inside a freshly-built decoder, so a half-rebuilt matrix
//! is never observable.
//!
//! ## Pipeline
//!
//! ```text
//! ACN index ─► (n, m) ─► complex SN3D harmonics  Y  (L × M)
//!                               │
//!               per-degree unitary C  (complex → real)
//!                               │
//!                       Y_real = Re(C · Yᵀ)ᵀ
//!                               │
//!              FuMa column reorder (N ≤ 1 only)
//!                               │
//!                 Moore–Penrose pseudo-inverse  (M × L)
//! ```

pub mod harmonics;
pub mod pinv;

use ndarray::{Array1, Array2};
use rustfft::num_complex::Complex;
use tracing::debug;

use crate::config::{ChannelOrdering, DecoderConfig, Weighting};
use crate::error::{AmbidecError, Result};
use crate::geometry::Geometry;

use harmonics::{acn_to_degree_order, complex_sh, max_re_weights};
use pinv::pseudo_inverse;

/// FuMa (W, X, Y, Z) positions of the first-order ACN channels (W, Y, Z, X).
const FUMA_FIRST_ORDER: [usize; 4] = [0, 3, 1, 2];

/// An ambisonic-to-loudspeaker decode transform, fully determined by one
/// `(DecoderConfig, Geometry)` pair. Never mutated — reconfiguration builds
/// a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingMatrix {
    /// (N+1)² × numLoudspeakers decode matrix (pseudo-inverse of the
    /// re-encoding matrix).
    matrix: Array2<f64>,
    /// Per-ambisonic-channel weights applied to the signal before the
    /// matrix multiply.
    weights: Array1<f64>,
    order: u32,
    ordering: ChannelOrdering,
}

impl DecodingMatrix {
    /// Build the decode matrix for a configuration and loudspeaker layout.
    ///
    /// # Errors
    /// `FumaUnsupportedOrder` for FuMa ordering above first order. (Also
    /// rejected by `DecoderConfig::new`; enforced here again since this is
    /// where the reorder would silently go wrong.)
    pub fn build(config: &DecoderConfig, geometry: &Geometry) -> Result<Self> {
        let order = config.order();
        let ambi_channels = config.ambi_channels();

        let y_real = resynthesis_matrix(order, geometry);
        let y_real = match config.ordering() {
            ChannelOrdering::Acn => y_real,
            ChannelOrdering::FuMa if order == 0 => y_real,
            ChannelOrdering::FuMa if order == 1 => reorder_columns(&y_real, &FUMA_FIRST_ORDER),
            ChannelOrdering::FuMa => return Err(AmbidecError::FumaUnsupportedOrder(order)),
        };

        let matrix = pseudo_inverse(&y_real);
        debug_assert_eq!(matrix.dim(), (ambi_channels, geometry.len()));

        let weights = match config.weighting() {
            Weighting::Flat => Array1::ones(ambi_channels),
            Weighting::MaxRe => Array1::from_vec(max_re_weights(order)),
        };

        debug!(
            order,
            loudspeakers = geometry.len(),
            ordering = %config.ordering(),
            weighting = %config.weighting(),
            "decoding matrix built"
        );

        Ok(Self {
            matrix,
            weights,
            order,
            ordering: config.ordering(),
        })
    }

    /// The (N+1)² × numLoudspeakers decode matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Per-ambisonic-channel weighting vector, length (N+1)².
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn ambi_channels(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn loudspeakers(&self) -> usize {
        self.matrix.ncols()
    }
}

/// The loudspeaker re-encoding matrix: real SN3D harmonics of every
/// ambisonic channel evaluated at every loudspeaker direction
/// (numLoudspeakers × (N+1)², ACN column order).
///
/// Public within the crate for the round-trip tests: a plane wave from
/// direction d encodes as the row of this matrix for d.
pub fn resynthesis_matrix(order: u32, geometry: &Geometry) -> Array2<f64> {
    let ambi_channels = ((order + 1) * (order + 1)) as usize;

    let mut y = Array2::<Complex<f64>>::zeros((geometry.len(), ambi_channels));
    for (l, spk) in geometry.iter().enumerate() {
        for i in 0..ambi_channels {
            let (n, m) = acn_to_degree_order(i);
            y[[l, i]] = complex_sh(n, m, spk.azimuth, spk.elevation);
        }
    }

    let c = complex_to_real_transform(order);
    // Y_real = Re(C · Yᵀ)ᵀ
    let product = c.dot(&y.t());
    product.t().map(|z| z.re)
}

/// Block-diagonal unitary transform from complex to real harmonics.
///
/// The degree-n block is (2n+1) × (2n+1) and couples only orders of equal
/// magnitude; every entry carries a 1/√2 scale:
///
/// - row m = 0:   1 on the diagonal (√2 · 1/√2)
/// - row m > 0:   (−1)^m/√2 at +m, 1/√2 at −m
/// - row m < 0:   −i(−1)^m/√2 at +|m|, i/√2 at −|m|
///
/// The (−1)^m cancels the Condon-Shortley phase, giving ambiX-convention
/// real harmonics.
fn complex_to_real_transform(order: u32) -> Array2<Complex<f64>> {
    use harmonics::acn_index;

    let channels = ((order + 1) * (order + 1)) as usize;
    let inv_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
    let mut c = Array2::<Complex<f64>>::zeros((channels, channels));

    for n in 0..=order {
        c[[acn_index(n, 0), acn_index(n, 0)]] = Complex::new(1.0, 0.0);
        for m in 1..=n as i32 {
            let cs = if m % 2 == 0 { 1.0 } else { -1.0 };
            let row_pos = acn_index(n, m);
            let row_neg = acn_index(n, -m);
            let col_pos = acn_index(n, m);
            let col_neg = acn_index(n, -m);

            c[[row_pos, col_pos]] = Complex::new(cs * inv_sqrt2, 0.0);
            c[[row_pos, col_neg]] = Complex::new(inv_sqrt2, 0.0);
            c[[row_neg, col_pos]] = Complex::new(0.0, -cs * inv_sqrt2);
            c[[row_neg, col_neg]] = Complex::new(0.0, inv_sqrt2);
        }
    }
    c
}

/// Columns of `a` permuted so that new column `j` is old column `perm[j]`.
fn reorder_columns(a: &Array2<f64>, perm: &[usize]) -> Array2<f64> {
    debug_assert_eq!(a.ncols(), perm.len());
    let mut out = Array2::zeros(a.dim());
    for (j, &src) in perm.iter().enumerate() {
        out.column_mut(j).assign(&a.column(src));
    }
    out
}
