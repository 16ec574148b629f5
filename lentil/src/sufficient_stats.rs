//! Sufficient statistics of the Gibbs conditionals.
//!
//! The column conditionals of `W` need `C = H H'` and `D = V H'`; the row
//! conditionals of `H` need `E = W' W` and `F = W' V`. Both pairs are
//! recomputed from scratch once per sweep-half.

use crate::common::*;

/// Gram and cross-product of `H` for the basis update.
pub struct BasisStats {
    /// `H H'` (rank x rank)
    pub gram: Mat,
    /// `V H'` (m x rank)
    pub cross: Mat,
}

/// Gram and cross-product of `W` for the mixture update.
pub struct MixtureStats {
    /// `W' W` (rank x rank)
    pub gram: Mat,
    /// `W' V` (rank x n)
    pub cross: Mat,
}

impl BasisStats {
    pub fn new(v: &Mat, h: &Mat) -> Self {
        let ht = h.transpose();
        Self {
            gram: h * &ht,
            cross: v * &ht,
        }
    }
}

impl MixtureStats {
    pub fn new(v: &Mat, w: &Mat) -> Self {
        let wt = w.transpose();
        Self {
            gram: &wt * w,
            cross: &wt * v,
        }
    }
}

/// Squared Frobenius norm of the residual, `sum (V - W H)^2`
pub fn objective(v: &Mat, w: &Mat, h: &Mat) -> f64 {
    (v - w * h).norm_squared()
}

/// `||V||^2 / 2`, fixed for the whole job
pub fn half_squared_norm(v: &Mat) -> f64 {
    v.norm_squared() / 2.0
}

/// `<W, W C - 2 D> / 2` where `C`, `D` are the basis statistics.
///
/// Added to `||V||^2 / 2` this is half the residual sum of squares
/// `||V - W H||^2 / 2` for the `H` that produced the statistics.
pub fn noise_error_term(w: &Mat, stats: &BasisStats) -> f64 {
    let wc = w * &stats.gram;
    w.component_mul(&(wc - &stats.cross * 2.0)).sum() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use matrix_util::traits::SampleOps;

    #[test]
    fn error_term_matches_residual() {
        let mut rng = SmallRng::seed_from_u64(3);
        let v = Mat::runif_with(7, 5, &mut rng);
        let w = Mat::runif_with(7, 3, &mut rng);
        let h = Mat::runif_with(3, 5, &mut rng);

        let stats = BasisStats::new(&v, &h);
        let lhs = half_squared_norm(&v) + noise_error_term(&w, &stats);
        let rhs = objective(&v, &w, &h) / 2.0;
        assert_relative_eq!(lhs, rhs, max_relative = 1e-10);
    }

    #[test]
    fn statistics_have_expected_shapes() {
        let mut rng = SmallRng::seed_from_u64(5);
        let v = Mat::runif_with(6, 4, &mut rng);
        let w = Mat::runif_with(6, 2, &mut rng);
        let h = Mat::runif_with(2, 4, &mut rng);

        let b = BasisStats::new(&v, &h);
        assert_eq!(b.gram.shape(), (2, 2));
        assert_eq!(b.cross.shape(), (6, 2));
        assert_relative_eq!(b.gram.clone(), b.gram.transpose());

        let m = MixtureStats::new(&v, &w);
        assert_eq!(m.gram.shape(), (2, 2));
        assert_eq!(m.cross.shape(), (2, 4));
    }

    #[test]
    fn objective_of_exact_factorization_is_zero() {
        let w = Mat::from_row_slice(2, 1, &[1.0, 2.0]);
        let h = Mat::from_row_slice(1, 3, &[1.0, 0.5, 3.0]);
        let v = &w * &h;
        assert_eq!(objective(&v, &w, &h), 0.0);
        assert_eq!(half_squared_norm(&Mat::from_element(4, 3, 1.0)), 6.0);
    }
}
