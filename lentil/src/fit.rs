//! Terminal state of a finished run and summaries of its quality.

use crate::common::*;
use crate::convergence::StopReason;

/// A fitted factorization from one run
#[derive(Debug, Clone)]
pub struct BdFit {
    /// basis matrix `W` (m x rank)
    pub w: Mat,
    /// mixture matrix `H` (rank x n)
    pub h: Mat,
    /// posterior draw of the noise variance
    pub sigma: f64,
    /// last evaluated squared-error objective
    pub final_obj: f64,
    /// outer iterations executed, including the final one
    pub n_iter: usize,
    /// Gibbs sweeps executed, burn-in included
    pub n_sweeps: usize,
    /// index of the run that produced this fit
    pub run: usize,
    pub stop_reason: Option<StopReason>,
}

impl BdFit {
    pub fn basis(&self) -> &Mat {
        &self.w
    }

    pub fn coef(&self) -> &Mat {
        &self.h
    }

    pub fn rank(&self) -> usize {
        self.w.ncols()
    }

    /// `W H`
    pub fn fitted(&self) -> Mat {
        &self.w * &self.h
    }

    /// `V - W H`
    pub fn residuals(&self, v: &Mat) -> Mat {
        v - self.fitted()
    }

    /// Residual sum of squares
    pub fn rss(&self, v: &Mat) -> f64 {
        self.residuals(v).norm_squared()
    }

    /// Explained variance `1 - rss / ||V||^2`
    pub fn evar(&self, v: &Mat) -> f64 {
        let tot = v.norm_squared();
        if tot > 0.0 {
            1.0 - self.rss(v) / tot
        } else {
            0.0
        }
    }

    /// Average Hoyer sparseness of the columns of `W` and of `H`
    pub fn sparseness(&self) -> (f64, f64) {
        fn mean_sparseness(cols: impl Iterator<Item = Vec<f64>>) -> f64 {
            let vals: Vec<f64> = cols.map(|x| hoyer_sparseness(&x)).collect();
            if vals.is_empty() {
                0.0
            } else {
                vals.iter().sum::<f64>() / vals.len() as f64
            }
        }
        let sw = mean_sparseness(self.w.column_iter().map(|c| c.iter().copied().collect()));
        let sh = mean_sparseness(self.h.column_iter().map(|c| c.iter().copied().collect()));
        (sw, sh)
    }
}

/// `(sqrt(d) - |x|_1 / |x|_2) / (sqrt(d) - 1)`; zero for empty,
/// single-element or all-zero vectors
pub fn hoyer_sparseness(x: &[f64]) -> f64 {
    let d = x.len() as f64;
    let l2 = x.iter().map(|v| v * v).sum::<f64>().sqrt();
    if x.len() < 2 || l2 <= 0.0 {
        return 0.0;
    }
    let l1 = x.iter().map(|v| v.abs()).sum::<f64>();
    (d.sqrt() - l1 / l2) / (d.sqrt() - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn toy_fit() -> BdFit {
        BdFit {
            w: Mat::from_row_slice(2, 1, &[1.0, 0.0]),
            h: Mat::from_row_slice(1, 2, &[2.0, 2.0]),
            sigma: 1.0,
            final_obj: 0.0,
            n_iter: 0,
            n_sweeps: 0,
            run: 0,
            stop_reason: None,
        }
    }

    #[test]
    fn residual_summaries() {
        let fit = toy_fit();
        let v = Mat::from_row_slice(2, 2, &[2.0, 2.0, 1.0, 1.0]);
        assert_eq!(fit.fitted(), Mat::from_row_slice(2, 2, &[2.0, 2.0, 0.0, 0.0]));
        assert_eq!(fit.rss(&v), 2.0);
        assert_abs_diff_eq!(fit.evar(&v), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn sparseness_extremes() {
        assert_abs_diff_eq!(hoyer_sparseness(&[0.0, 0.0, 3.0, 0.0]), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hoyer_sparseness(&[1.0, 1.0, 1.0, 1.0]), 0.0, epsilon = 1e-12);
        assert_eq!(hoyer_sparseness(&[0.0, 0.0]), 0.0);

        let (sw, sh) = toy_fit().sparseness();
        assert_abs_diff_eq!(sw, 1.0, epsilon = 1e-12);
        assert_eq!(sh, 0.0);
    }
}
