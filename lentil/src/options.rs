//! Options of a Bayesian Decomposition job and their validation.

use crate::common::*;

/// Options for Bayesian Decomposition.
///
/// All fields are optional in spirit; [`Default`] reproduces the
/// standard configuration.
#[derive(Debug, Clone)]
pub struct BdOptions {
    /// Number of independent runs. Default: 1
    pub n_run: usize,
    /// Hard cap on outer iterations per run. Default: 30
    pub max_iter: Option<usize>,
    /// Stop once `curr - prev` objective is at most this. Default: unset
    pub min_residuals: Option<f64>,
    /// Linear prior tilt on `W` (m x rank). Default: zeros
    pub alpha: Option<Mat>,
    /// Linear prior tilt on `H` (rank x n). Default: zeros
    pub beta: Option<Mat>,
    /// Inverse-Gamma prior scale term. Default: 0
    pub theta: f64,
    /// Inverse-Gamma prior shape term. Default: 0
    pub k: f64,
    /// Initial noise variance. Default: 1
    pub sigma: f64,
    /// Burn-in sweeps in the first iteration of each run. Default: 100
    pub skip: usize,
    /// Sweeps per iteration after the first. Default: 1
    pub stride: usize,
    /// `n_w[i] == true` holds column `i` of `W` fixed. Default: none
    pub n_w: Option<Vec<bool>>,
    /// `n_h[i] == true` holds row `i` of `H` fixed. Default: none
    pub n_h: Option<Vec<bool>>,
    /// Hold the noise variance fixed. Default: false
    pub n_sigma: bool,
    /// Record the terminal state of every run (needs `n_run > 1`). Default: false
    pub track: bool,
    /// Recompute the objective every `test_conv` iterations. Default: every iteration
    pub test_conv: Option<usize>,
    /// Base seed; run `r` draws from a generator seeded with `seed + r`. Default: 42
    pub seed: u64,
    /// Execute runs on the rayon pool. Default: false
    pub parallel: bool,
}

impl Default for BdOptions {
    fn default() -> Self {
        BdOptions {
            n_run: 1,
            max_iter: Some(DEFAULT_MAX_ITER),
            min_residuals: None,
            alpha: None,
            beta: None,
            theta: 0.0,
            k: 0.0,
            sigma: DEFAULT_SIGMA,
            skip: DEFAULT_SKIP,
            stride: DEFAULT_STRIDE,
            n_w: None,
            n_h: None,
            n_sigma: false,
            track: false,
            test_conv: None,
            seed: DEFAULT_SEED,
            parallel: false,
        }
    }
}

/// Priors and freeze masks resolved against the shape of a job.
#[derive(Debug, Clone)]
pub struct BdPriors {
    pub alpha: Mat,
    pub beta: Mat,
    pub theta: f64,
    pub k: f64,
    pub n_w: Vec<bool>,
    pub n_h: Vec<bool>,
    pub n_sigma: bool,
}

fn invalid(msg: String) -> anyhow::Error {
    BdError::InvalidConfig(msg).into()
}

fn check_shape(name: &'static str, mat: &Mat, expected: (usize, usize)) -> anyhow::Result<()> {
    if mat.shape() != expected {
        return Err(BdError::ShapeMismatch {
            name,
            expected,
            got: mat.shape(),
        }
        .into());
    }
    if mat.iter().any(|x| !x.is_finite()) {
        return Err(invalid(format!("`{}` has non-finite entries", name)));
    }
    Ok(())
}

fn resolve_mask(name: &'static str, mask: &Option<Vec<bool>>, rank: usize) -> anyhow::Result<Vec<bool>> {
    match mask {
        Some(mask) if mask.len() != rank => Err(BdError::ShapeMismatch {
            name,
            expected: (rank, 1),
            got: (mask.len(), 1),
        }
        .into()),
        Some(mask) => Ok(mask.clone()),
        None => Ok(vec![false; rank]),
    }
}

/// Reject an empty, negative or non-finite target matrix
pub fn check_target(v: &Mat) -> anyhow::Result<()> {
    if v.nrows() == 0 || v.ncols() == 0 {
        return Err(invalid(format!("empty target matrix {:?}", v.shape())));
    }
    if let Some(x) = v.iter().find(|x| !x.is_finite() || **x < 0.0) {
        return Err(invalid(format!(
            "target matrix must be finite and nonnegative, found {}",
            x
        )));
    }
    Ok(())
}

impl BdOptions {
    /// Check every option against an `m x n` target and `rank`, and
    /// fill in the default priors and masks.
    pub fn validate(&self, m: usize, n: usize, rank: usize) -> anyhow::Result<BdPriors> {
        if rank == 0 {
            return Err(invalid("rank must be positive".into()));
        }
        if self.n_run == 0 {
            return Err(invalid("n_run must be positive".into()));
        }
        if self.stride == 0 {
            return Err(invalid("stride must be positive".into()));
        }
        if self.test_conv == Some(0) {
            return Err(invalid("test_conv must be positive".into()));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(invalid(format!(
                "initial sigma must be positive, got {}",
                self.sigma
            )));
        }
        if !self.theta.is_finite() || !self.k.is_finite() {
            return Err(invalid(format!(
                "theta and k must be finite, got theta = {}, k = {}",
                self.theta, self.k
            )));
        }
        if let Some(eps) = self.min_residuals {
            if !eps.is_finite() {
                return Err(invalid(format!("min_residuals must be finite, got {}", eps)));
            }
        }

        let alpha = match &self.alpha {
            Some(alpha) => {
                check_shape("alpha", alpha, (m, rank))?;
                alpha.clone()
            }
            None => Mat::zeros(m, rank),
        };

        let beta = match &self.beta {
            Some(beta) => {
                check_shape("beta", beta, (rank, n))?;
                beta.clone()
            }
            None => Mat::zeros(rank, n),
        };

        let n_w = resolve_mask("n_w", &self.n_w, rank)?;
        let n_h = resolve_mask("n_h", &self.n_h, rank)?;

        if rank > m.min(n) {
            warn!("rank {} exceeds min(m, n) = {}", rank, m.min(n));
        }
        if self.track && self.n_run < 2 {
            debug!("tracking is only enabled for more than one run");
        }

        Ok(BdPriors {
            alpha,
            beta,
            theta: self.theta,
            k: self.k,
            n_w,
            n_h,
            n_sigma: self.n_sigma,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_shape_mismatch(res: anyhow::Result<BdPriors>, expected_name: &str) {
        let err = res.expect_err("should fail");
        match err.downcast_ref::<BdError>() {
            Some(BdError::ShapeMismatch { name, .. }) => assert_eq!(*name, expected_name),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn defaults_resolve_to_zero_priors() -> anyhow::Result<()> {
        let opts = BdOptions::default();
        assert_eq!(opts.max_iter, Some(30));
        assert_eq!(opts.skip, 100);
        assert_eq!(opts.stride, 1);
        assert_eq!(opts.sigma, 1.0);

        let priors = opts.validate(4, 3, 2)?;
        assert_eq!(priors.alpha, Mat::zeros(4, 2));
        assert_eq!(priors.beta, Mat::zeros(2, 3));
        assert_eq!(priors.n_w, vec![false, false]);
        assert_eq!(priors.n_h, vec![false, false]);
        assert!(!priors.n_sigma);
        Ok(())
    }

    #[test]
    fn mis_shaped_priors_are_rejected() {
        let opts = BdOptions {
            alpha: Some(Mat::zeros(3, 2)),
            ..Default::default()
        };
        expect_shape_mismatch(opts.validate(4, 3, 2), "alpha");

        let opts = BdOptions {
            beta: Some(Mat::zeros(2, 4)),
            ..Default::default()
        };
        expect_shape_mismatch(opts.validate(4, 3, 2), "beta");

        let opts = BdOptions {
            n_w: Some(vec![true]),
            ..Default::default()
        };
        expect_shape_mismatch(opts.validate(4, 3, 2), "n_w");

        let opts = BdOptions {
            n_h: Some(vec![true, false, false]),
            ..Default::default()
        };
        expect_shape_mismatch(opts.validate(4, 3, 2), "n_h");
    }

    #[test]
    fn out_of_range_scalars_are_rejected() {
        let bad = [
            BdOptions {
                sigma: 0.0,
                ..Default::default()
            },
            BdOptions {
                stride: 0,
                ..Default::default()
            },
            BdOptions {
                n_run: 0,
                ..Default::default()
            },
            BdOptions {
                test_conv: Some(0),
                ..Default::default()
            },
            BdOptions {
                theta: f64::NAN,
                ..Default::default()
            },
        ];
        for opts in bad.iter() {
            let err = opts.validate(4, 3, 2).expect_err("should fail");
            assert!(matches!(
                err.downcast_ref::<BdError>(),
                Some(BdError::InvalidConfig(_))
            ));
        }
        assert!(BdOptions::default().validate(4, 3, 0).is_err());
    }

    #[test]
    fn target_must_be_nonnegative() {
        assert!(check_target(&Mat::from_element(2, 2, 1.0)).is_ok());
        assert!(check_target(&Mat::from_row_slice(1, 2, &[1.0, -1.0])).is_err());
        assert!(check_target(&Mat::from_row_slice(1, 2, &[1.0, f64::NAN])).is_err());
        assert!(check_target(&Mat::zeros(0, 3)).is_err());
    }
}
