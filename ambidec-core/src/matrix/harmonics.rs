//! Spherical-harmonic and Legendre-polynomial evaluation.
//!
//! Directions follow the geometry convention: azimuth θ counter-clockwise
//! from front, elevation φ positive upward, so the polar argument of the
//! associated Legendre function is `sin φ`.

use rustfft::num_complex::Complex;

/// Recover (degree n, order m) from an ACN channel index.
///
/// `n = isqrt(i)`, `m = i − n² − n`.
pub fn acn_to_degree_order(i: usize) -> (u32, i32) {
    let n = i.isqrt();
    let m = i as i64 - (n * n + n) as i64;
    (n as u32, m as i32)
}

/// ACN channel index of (degree n, order m).
pub fn acn_index(n: u32, m: i32) -> usize {
    let n = n as i64;
    (n * n + n + i64::from(m)) as usize
}

/// Associated Legendre function `P_n^m(x)` for `0 ≤ m ≤ n`, with the
/// Condon-Shortley phase.
///
/// Standard two-step recurrence: diagonal to `P_m^m`, then upward in degree.
pub fn assoc_legendre(n: u32, m: u32, x: f64) -> f64 {
    debug_assert!(m <= n);

    // P_m^m = (-1)^m (2m-1)!! (1-x²)^{m/2}
    let somx2 = ((1.0 - x) * (1.0 + x)).max(0.0).sqrt();
    let mut pmm = 1.0;
    let mut fact = 1.0;
    for _ in 0..m {
        pmm *= -fact * somx2;
        fact += 2.0;
    }
    if n == m {
        return pmm;
    }

    // P_{m+1}^m = x (2m+1) P_m^m
    let mut pmm1 = x * (2.0 * f64::from(m) + 1.0) * pmm;
    if n == m + 1 {
        return pmm1;
    }

    let (mf, mut result) = (f64::from(m), 0.0);
    for l in (m + 2)..=n {
        let lf = f64::from(l);
        result = ((2.0 * lf - 1.0) * x * pmm1 - (lf + mf - 1.0) * pmm) / (lf - mf);
        pmm = pmm1;
        pmm1 = result;
    }
    result
}

/// SN3D semi-normalization for the complex harmonic of order `m ≥ 0`:
/// `√((n−m)! / (n+m)!)`. The real-harmonic `√(2−δ_m0)` factor comes from the
/// complex→real transform, not from here.
fn sn3d_complex_factor(n: u32, m: u32) -> f64 {
    // (n-m)!/(n+m)! as a running product, avoiding large factorials
    let mut ratio = 1.0;
    for k in (n - m + 1)..=(n + m) {
        ratio /= f64::from(k);
    }
    ratio.sqrt()
}

/// Complex SN3D spherical harmonic of degree `n`, order `m` at
/// (azimuth, elevation) in radians.
///
/// Negative orders use the conjugate symmetry `Y^{-m} = (-1)^m conj(Y^m)`.
pub fn complex_sh(n: u32, m: i32, azimuth: f64, elevation: f64) -> Complex<f64> {
    let abs_m = m.unsigned_abs();
    let norm = sn3d_complex_factor(n, abs_m);
    let p = assoc_legendre(n, abs_m, elevation.sin());
    let positive = Complex::from_polar(norm * p, f64::from(abs_m) * azimuth);
    if m >= 0 {
        positive
    } else if abs_m % 2 == 0 {
        positive.conj()
    } else {
        -positive.conj()
    }
}

/// Legendre polynomial `P_n(x)` by the Bonnet recurrence.
pub fn legendre(n: u32, x: f64) -> f64 {
    match n {
        0 => 1.0,
        1 => x,
        _ => {
            let mut p0 = 1.0;
            let mut p1 = x;
            for l in 2..=n {
                let lf = f64::from(l);
                let p2 = ((2.0 * lf - 1.0) * x * p1 - (lf - 1.0) * p0) / lf;
                p0 = p1;
                p1 = p2;
            }
            p1
        }
    }
}

/// Largest real root of `P_n` (n ≥ 1), by Newton iteration from the
/// classical cosine estimate.
pub fn largest_legendre_root(n: u32) -> f64 {
    debug_assert!(n >= 1);
    let nf = f64::from(n);
    let mut x = (3.0 * std::f64::consts::PI / (4.0 * nf + 2.0)).cos();
    for _ in 0..100 {
        let p = legendre(n, x);
        // P'_n(x) = n (x P_n - P_{n-1}) / (x² - 1)
        let dp = nf * (x * p - legendre(n - 1, x)) / (x * x - 1.0);
        let step = p / dp;
        x -= step;
        if step.abs() < 1e-15 {
            break;
        }
    }
    x
}

/// Per-ambisonic-channel max-rE weights for order `N`:
/// `w_i = P_{isqrt(i)}(E)` with `E` the largest root of `P_{N+1}`.
pub fn max_re_weights(order: u32) -> Vec<f64> {
    let e = largest_legendre_root(order + 1);
    let channels = ((order + 1) * (order + 1)) as usize;
    (0..channels)
        .map(|i| legendre(i.isqrt() as u32, e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn acn_mapping_round_trips() {
        for i in 0..25 {
            let (n, m) = acn_to_degree_order(i);
            assert!(m.unsigned_abs() <= n);
            assert_eq!(acn_index(n, m), i);
        }
        assert_eq!(acn_to_degree_order(0), (0, 0));
        assert_eq!(acn_to_degree_order(1), (1, -1));
        assert_eq!(acn_to_degree_order(2), (1, 0));
        assert_eq!(acn_to_degree_order(3), (1, 1));
        assert_eq!(acn_to_degree_order(6), (2, 0));
    }

    #[test]
    fn low_degree_assoc_legendre_matches_closed_forms() {
        for &x in &[-0.9, -0.3, 0.0, 0.4, 0.8] {
            assert_abs_diff_eq!(assoc_legendre(0, 0, x), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(assoc_legendre(1, 0, x), x, epsilon = 1e-12);
            // With Condon-Shortley phase
            assert_abs_diff_eq!(
                assoc_legendre(1, 1, x),
                -(1.0 - x * x).sqrt(),
                epsilon = 1e-12
            );
            assert_abs_diff_eq!(
                assoc_legendre(2, 0, x),
                0.5 * (3.0 * x * x - 1.0),
                epsilon = 1e-12
            );
            assert_abs_diff_eq!(
                assoc_legendre(2, 1, x),
                -3.0 * x * (1.0 - x * x).sqrt(),
                epsilon = 1e-12
            );
            assert_abs_diff_eq!(assoc_legendre(2, 2, x), 3.0 * (1.0 - x * x), epsilon = 1e-12);
        }
    }

    #[test]
    fn complex_sh_conjugate_symmetry() {
        let (az, el) = (0.7, -0.3);
        for n in 0..4u32 {
            for m in 1..=n as i32 {
                let pos = complex_sh(n, m, az, el);
                let neg = complex_sh(n, -m, az, el);
                let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
                assert_abs_diff_eq!(neg.re, sign * pos.conj().re, epsilon = 1e-12);
                assert_abs_diff_eq!(neg.im, sign * pos.conj().im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn zenith_kills_all_nonzero_orders() {
        // At the zenith every m ≠ 0 harmonic vanishes (cos φ = 0)
        for n in 1..4u32 {
            for m in [-(n as i32), -1, 1, n as i32] {
                let y = complex_sh(n, m, 0.0, FRAC_PI_2);
                assert_abs_diff_eq!(y.norm(), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn legendre_root_is_a_root_and_is_largest() {
        for n in 1..8u32 {
            let e = largest_legendre_root(n);
            assert_abs_diff_eq!(legendre(n, e), 0.0, epsilon = 1e-10);
            assert!(e < 1.0);
            // No sign change between the root and 1 means no larger root
            assert!(legendre(n, (e + 1.0) / 2.0) * legendre(n, 1.0 - 1e-9) > 0.0);
        }
        // P_2 largest root is 1/√3
        assert_abs_diff_eq!(
            largest_legendre_root(2),
            1.0 / 3.0f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn max_re_weights_taper_with_degree() {
        let w = max_re_weights(3);
        assert_eq!(w.len(), 16);
        assert_abs_diff_eq!(w[0], 1.0, epsilon = 1e-12);
        // All channels of a degree share one weight
        assert_eq!(w[1], w[2]);
        assert_eq!(w[2], w[3]);
        // Strictly decreasing per degree
        assert!(w[0] > w[1]);
        assert!(w[1] > w[4]);
        assert!(w[4] > w[9]);
        assert!(w[9] > 0.0);
    }
}
