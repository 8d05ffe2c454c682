//! Moore–Penrose pseudo-inverse via one-sided Jacobi SVD.
//!
//! Decoding matrices are small (tens of rows/columns) and built off the
//! real-time thread, so a plain Jacobi sweep is plenty fast. Unlike the
//! normal-equations shortcut it stays correct for rank-deficient layouts —
//! a horizontal ring produces an all-zero Z column, and its pseudo-inverse
//! must carry an all-zero Z row rather than blow up.

use ndarray::Array2;

/// Maximum Jacobi sweeps before giving up on further convergence.
const MAX_SWEEPS: usize = 64;

/// Relative off-diagonal threshold at which a sweep is considered converged.
const CONVERGENCE: f64 = 1e-14;

/// Compute the Moore–Penrose pseudo-inverse of `a`.
///
/// For an (r × c) input the result is (c × r). Singular values below
/// `max(r, c) · σ_max · ε` are treated as zero (least-squares rank
/// truncation).
pub fn pseudo_inverse(a: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = a.dim();
    if rows == 0 || cols == 0 {
        return Array2::zeros((cols, rows));
    }
    // One-sided Jacobi wants at least as many rows as columns.
    if rows < cols {
        return pseudo_inverse(&a.t().to_owned()).t().to_owned();
    }

    // u starts as a copy of a; its columns converge to U·diag(σ).
    let mut u = a.clone();
    let mut v: Array2<f64> = Array2::eye(cols);

    for _ in 0..MAX_SWEEPS {
        let mut worst = 0.0f64;

        for p in 0..cols.saturating_sub(1) {
            for q in (p + 1)..cols {
                let mut alpha = 0.0;
                let mut beta = 0.0;
                let mut gamma = 0.0;
                for i in 0..rows {
                    alpha += u[[i, p]] * u[[i, p]];
                    beta += u[[i, q]] * u[[i, q]];
                    gamma += u[[i, p]] * u[[i, q]];
                }
                if gamma == 0.0 || alpha == 0.0 || beta == 0.0 {
                    continue;
                }

                let rel = gamma.abs() / (alpha * beta).sqrt();
                worst = worst.max(rel);
                if rel < CONVERGENCE {
                    continue;
                }

                // Jacobi rotation zeroing the (p, q) inner product; equal
                // column norms (zeta = 0) take the full 45° rotation.
                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = if zeta == 0.0 {
                    1.0
                } else {
                    zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt())
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;

                for i in 0..rows {
                    let up = u[[i, p]];
                    let uq = u[[i, q]];
                    u[[i, p]] = c * up - s * uq;
                    u[[i, q]] = s * up + c * uq;
                }
                for i in 0..cols {
                    let vp = v[[i, p]];
                    let vq = v[[i, q]];
                    v[[i, p]] = c * vp - s * vq;
                    v[[i, q]] = s * vp + c * vq;
                }
            }
        }

        if worst < CONVERGENCE {
            break;
        }
    }

    // Singular values are the column norms of the rotated u.
    let sigma: Vec<f64> = (0..cols)
        .map(|j| u.column(j).iter().map(|x| x * x).sum::<f64>().sqrt())
        .collect();
    let sigma_max = sigma.iter().cloned().fold(0.0f64, f64::max);
    let tol = sigma_max * rows.max(cols) as f64 * f64::EPSILON;

    // pinv = V · diag(1/σ) · Ûᵀ with û_k = u_k / σ_k, dropping σ_k ≤ tol:
    // pinv[i, j] = Σ_k v[i, k] · u[j, k] / σ_k²
    let mut pinv = Array2::zeros((cols, rows));
    for (k, &sk) in sigma.iter().enumerate() {
        if sk <= tol {
            continue;
        }
        let inv_sq = 1.0 / (sk * sk);
        for i in 0..cols {
            let vik = v[[i, k]] * inv_sq;
            if vik == 0.0 {
                continue;
            }
            for j in 0..rows {
                pinv[[i, j]] += vik * u[[j, k]];
            }
        }
    }
    pinv
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_matrix_eq(a: &Array2<f64>, b: &Array2<f64>, eps: f64) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = eps);
        }
    }

    #[test]
    fn identity_is_its_own_pseudo_inverse() {
        let eye: Array2<f64> = Array2::eye(5);
        assert_matrix_eq(&pseudo_inverse(&eye), &eye, 1e-12);
    }

    #[test]
    fn square_invertible_matches_inverse() {
        let a = array![[4.0, 7.0], [2.0, 6.0]];
        // det = 10
        let inv = array![[0.6, -0.7], [-0.2, 0.4]];
        assert_matrix_eq(&pseudo_inverse(&a), &inv, 1e-12);
    }

    #[test]
    fn tall_matrix_satisfies_penrose_conditions() {
        let a = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, -1.0]];
        let p = pseudo_inverse(&a);
        assert_eq!(p.dim(), (2, 4));
        assert_matrix_eq(&a.dot(&p).dot(&a), &a, 1e-10);
        assert_matrix_eq(&p.dot(&a).dot(&p), &p, 1e-10);
        // Left inverse for full column rank
        assert_matrix_eq(&p.dot(&a), &Array2::eye(2), 1e-10);
    }

    #[test]
    fn wide_matrix_satisfies_penrose_conditions() {
        let a = array![[1.0, 2.0, 3.0], [0.0, 1.0, -1.0]];
        let p = pseudo_inverse(&a);
        assert_eq!(p.dim(), (3, 2));
        assert_matrix_eq(&a.dot(&p).dot(&a), &a, 1e-10);
        // Right inverse for full row rank
        assert_matrix_eq(&a.dot(&p), &Array2::eye(2), 1e-10);
    }

    #[test]
    fn zero_column_yields_zero_row() {
        let a = array![[1.0, 0.0], [2.0, 0.0], [-1.0, 0.0]];
        let p = pseudo_inverse(&a);
        for j in 0..3 {
            assert_abs_diff_eq!(p[[1, j]], 0.0, epsilon = 1e-14);
        }
        assert_matrix_eq(&a.dot(&p).dot(&a), &a, 1e-10);
    }

    #[test]
    fn zero_matrix_maps_to_zero() {
        let a: Array2<f64> = Array2::zeros((3, 2));
        let p = pseudo_inverse(&a);
        assert_eq!(p.dim(), (2, 3));
        assert!(p.iter().all(|&x| x == 0.0));
    }
}
