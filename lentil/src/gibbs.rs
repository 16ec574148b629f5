//! Gibbs sampler for Bayesian nonnegative matrix factorization.
//!
//! One sweep resamples every free column of `W`, then the noise variance,
//! then every free row of `H`. Columns (rows) are visited in order and
//! written back immediately, so each conditional sees the components
//! already resampled in the same sweep (sequential Gibbs, not a block
//! update).

use crate::common::*;
use crate::options::BdPriors;
use crate::rectified_gaussian::sample_rectified_gaussian;
use crate::sufficient_stats::{noise_error_term, BasisStats, MixtureStats};
use rand_distr::{Distribution, Gamma};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Current state of one Markov chain
#[derive(Debug, Clone)]
pub struct ChainState {
    /// basis matrix (m x rank)
    pub w: Mat,
    /// mixture matrix (rank x n)
    pub h: Mat,
    /// noise variance
    pub sigma: f64,
}

/// Gibbs sampler over `(W, H, sigma^2)` for a fixed target `V`.
pub struct GibbsSampler<'a> {
    v: &'a Mat,
    priors: &'a BdPriors,
    /// `||V||^2 / 2`
    vhalf: f64,
    skip: usize,
    stride: usize,
    rng: SmallRng,
    run: usize,
    sweeps: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> GibbsSampler<'a> {
    /// Create a sampler for one run.
    ///
    /// * `v` - target matrix
    /// * `vhalf` - `||V||^2 / 2`, computed once per run
    /// * `priors` - validated priors and freeze masks
    /// * `skip` - sweeps executed in the first iteration
    /// * `stride` - sweeps executed in every later iteration
    /// * `rng` - the run's own generator
    pub fn new(
        v: &'a Mat,
        vhalf: f64,
        priors: &'a BdPriors,
        skip: usize,
        stride: usize,
        rng: SmallRng,
    ) -> Self {
        GibbsSampler {
            v,
            priors,
            vhalf,
            skip,
            stride,
            rng,
            run: 0,
            sweeps: 0,
            cancel: None,
        }
    }

    /// Tag errors and log lines with the run index
    pub fn with_run(mut self, run: usize) -> Self {
        self.run = run;
        self
    }

    /// Check `cancel` before every sweep
    pub fn with_cancel(mut self, cancel: Option<Arc<AtomicBool>>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Total sweeps executed so far
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Run the sweeps of outer iteration `iter`: `skip` sweeps when
    /// `iter == 0`, `stride` sweeps otherwise. Returns the number of
    /// sweeps executed.
    pub fn update(&mut self, state: &mut ChainState, iter: usize) -> anyhow::Result<usize> {
        let nsweep = if iter == 0 { self.skip } else { self.stride };
        for _ in 0..nsweep {
            self.sweep(state)?;
        }
        Ok(nsweep)
    }

    /// One full sweep over `W`, `sigma^2` and `H`
    pub fn sweep(&mut self, state: &mut ChainState) -> anyhow::Result<()> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(BdError::Cancelled {
                run: self.run,
                sweeps: self.sweeps,
            }
            .into());
        }

        let basis = BasisStats::new(self.v, &state.h);
        self.update_basis(state, &basis);

        if !self.priors.n_sigma {
            state.sigma = self.sample_sigma(&state.w, &basis)?;
        }

        let mixture = MixtureStats::new(self.v, &state.w);
        self.update_mixture(state, &mixture);

        self.sweeps += 1;
        Ok(())
    }

    /// Resample each free column `n` of `W` given all other columns:
    /// mean `(D[:,n] - sum_{j != n} W[:,j] C[j,n]) / C[n,n]`,
    /// variance `sigma^2 / C[n,n]`, tilt `alpha[:,n]`.
    fn update_basis(&mut self, state: &mut ChainState, stats: &BasisStats) {
        let rank = state.w.ncols();
        for n in 0..rank {
            if self.priors.n_w[n] {
                continue;
            }
            let c_nn = stats.gram[(n, n)];

            let mut mu: DVec = stats.cross.column(n).clone_owned();
            for j in (0..rank).filter(|&j| j != n) {
                mu.axpy(-stats.gram[(j, n)], &state.w.column(j), 1.0);
            }
            mu /= c_nn;

            let tilt: DVec = self.priors.alpha.column(n).clone_owned();
            let x = sample_rectified_gaussian(&mu, state.sigma / c_nn, &tilt, &mut self.rng);
            state.w.set_column(n, &x);
        }
    }

    /// Resample each free row `n` of `H`, symmetric to [`Self::update_basis`]
    fn update_mixture(&mut self, state: &mut ChainState, stats: &MixtureStats) {
        let rank = state.h.nrows();
        for n in 0..rank {
            if self.priors.n_h[n] {
                continue;
            }
            let e_nn = stats.gram[(n, n)];

            let mut mu: DVec = stats.cross.row(n).transpose();
            for j in (0..rank).filter(|&j| j != n) {
                mu.axpy(-stats.gram[(n, j)], &state.h.row(j).transpose(), 1.0);
            }
            mu /= e_nn;

            let tilt: DVec = self.priors.beta.row(n).transpose();
            let x = sample_rectified_gaussian(&mu, state.sigma / e_nn, &tilt, &mut self.rng);
            state.h.set_row(n, &x.transpose());
        }
    }

    /// Draw `sigma^2 ~ 1 / Gamma(shape, scale)` with
    /// `shape = m n / 2 + 1 + k` and
    /// `scale = 1 / (theta + ||V||^2 / 2 + <W, W C - 2 D> / 2)`
    fn sample_sigma(&mut self, w: &Mat, stats: &BasisStats) -> anyhow::Result<f64> {
        let (m, n) = self.v.shape();
        let shape = (m * n) as f64 / 2.0 + 1.0 + self.priors.k;
        let error_term = noise_error_term(w, stats);
        let denom = self.priors.theta + self.vhalf + error_term;
        let scale = 1.0 / denom;

        let (run, theta, k) = (self.run, self.priors.theta, self.priors.k);
        let degenerate = || BdError::NoiseVariance {
            run,
            shape,
            scale,
            theta,
            k,
            error_term,
        };

        if !(shape.is_finite() && shape > 0.0 && denom.is_finite() && denom > 0.0) {
            return Err(degenerate().into());
        }

        let gamma = Gamma::new(shape, scale).map_err(|_| degenerate())?;
        let sigma = 1.0 / gamma.sample(&mut self.rng);

        if sigma.is_finite() && sigma > 0.0 {
            Ok(sigma)
        } else {
            Err(degenerate().into())
        }
    }
}
