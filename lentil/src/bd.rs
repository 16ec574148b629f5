//! Bayesian Decomposition: independent Gibbs runs over a shared target.

use crate::common::*;
use crate::convergence::ConvergenceMonitor;
use crate::fit::BdFit;
use crate::gibbs::{ChainState, GibbsSampler};
use crate::options::{check_target, BdOptions, BdPriors};
use crate::seeding::Seeder;
use crate::sufficient_stats::{half_squared_norm, objective};
use crate::tracker::{RunTracker, Tracker};

use rayon::prelude::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Result of a factorization job
#[derive(Debug, Clone)]
pub struct BdOutput {
    /// fit of the last run
    pub fit: BdFit,
    /// terminal states of all runs, when tracking multiple runs
    pub tracker: Option<RunTracker>,
}

/// A validated factorization job `V ~ W H` of a fixed rank.
pub struct Bd {
    v: Mat,
    rank: usize,
    options: BdOptions,
    priors: BdPriors,
    vhalf: f64,
    cancel: Option<Arc<AtomicBool>>,
}

impl Bd {
    /// Validate the target and the options against `rank`
    pub fn new(v: Mat, rank: usize, options: BdOptions) -> anyhow::Result<Self> {
        check_target(&v)?;
        let priors = options.validate(v.nrows(), v.ncols(), rank)?;
        let vhalf = half_squared_norm(&v);
        Ok(Self {
            v,
            rank,
            options,
            priors,
            vhalf,
            cancel: None,
        })
    }

    /// Install a flag that aborts sampling at the next sweep boundary
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn target(&self) -> &Mat {
        &self.v
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn options(&self) -> &BdOptions {
        &self.options
    }

    fn tracking(&self) -> bool {
        self.options.track && self.options.n_run > 1
    }

    /// Run `n_run` independent chains, each initialized by `seeder`.
    ///
    /// `callback` sees every run's fit in run order, also when the runs
    /// are sampled in parallel. The first failing run aborts the job.
    pub fn factorize<S>(
        &self,
        seeder: &S,
        mut callback: Option<&mut dyn FnMut(&BdFit)>,
    ) -> anyhow::Result<BdOutput>
    where
        S: Seeder + ?Sized,
    {
        let n_run = self.options.n_run;
        info!(
            "factorizing {} x {} matrix, rank {}, {} run(s), seeder `{}`",
            self.v.nrows(),
            self.v.ncols(),
            self.rank,
            n_run,
            seeder.name()
        );

        let mut tracker = self.tracking().then(RunTracker::default);
        let mut last: Option<BdFit> = None;

        let mut deliver = |fit: BdFit| {
            if let Some(cb) = callback.as_deref_mut() {
                cb(&fit);
            }
            if let Some(tracker) = tracker.as_mut() {
                tracker.add(fit.w.clone(), fit.h.clone(), fit.sigma);
            }
            last = Some(fit);
        };

        if self.options.parallel && n_run > 1 {
            let fits: Vec<anyhow::Result<BdFit>> = (0..n_run)
                .into_par_iter()
                .map(|run| self.run_one(seeder, run))
                .collect();
            for fit in fits {
                deliver(fit?);
            }
        } else {
            for run in 0..n_run {
                deliver(self.run_one(seeder, run)?);
            }
        }

        let fit = last.ok_or_else(|| anyhow::anyhow!("no run was executed"))?;
        Ok(BdOutput { fit, tracker })
    }

    /// Sample a single run `run` to convergence
    pub fn run_one<S>(&self, seeder: &S, run: usize) -> anyhow::Result<BdFit>
    where
        S: Seeder + ?Sized,
    {
        let opts = &self.options;
        let mut rng = SmallRng::seed_from_u64(opts.seed.wrapping_add(run as u64));

        let (w, h) = seeder.initialize(&self.v, self.rank, &mut rng)?;
        self.check_seed(seeder.name(), &w, &h)?;

        let initial_obj = objective(&self.v, &w, &h);
        debug!("[run {}] initial objective: {}", run, initial_obj);

        let mut state = ChainState {
            w,
            h,
            sigma: opts.sigma,
        };

        let mut gibbs = GibbsSampler::new(
            &self.v,
            self.vhalf,
            &self.priors,
            opts.skip,
            opts.stride,
            rng,
        )
        .with_run(run)
        .with_cancel(self.cancel.clone());

        let mut monitor = ConvergenceMonitor::new(
            initial_obj,
            opts.max_iter,
            opts.min_residuals,
            opts.test_conv,
        );

        while monitor.should_continue() {
            gibbs.update(&mut state, monitor.iterations())?;
            monitor.advance(|| objective(&self.v, &state.w, &state.h));
        }

        let stop_reason = monitor.stop_reason();
        info!(
            "run {}: objective {} -> {} after {} iterations, {} sweeps ({})",
            run,
            initial_obj,
            monitor.current_objective(),
            monitor.iterations(),
            gibbs.sweeps(),
            stop_reason.map_or("-".to_string(), |r| r.to_string())
        );

        Ok(BdFit {
            final_obj: monitor.current_objective(),
            n_iter: monitor.iterations(),
            n_sweeps: gibbs.sweeps(),
            run,
            stop_reason,
            w: state.w,
            h: state.h,
            sigma: state.sigma,
        })
    }

    fn check_seed(&self, seeder: &str, w: &Mat, h: &Mat) -> anyhow::Result<()> {
        let (m, n) = self.v.shape();
        let invalid = |reason: String| -> anyhow::Error {
            BdError::InvalidSeed {
                seeder: seeder.to_string(),
                reason,
            }
            .into()
        };

        if w.shape() != (m, self.rank) {
            return Err(invalid(format!(
                "W is {:?}, expected {:?}",
                w.shape(),
                (m, self.rank)
            )));
        }
        if h.shape() != (self.rank, n) {
            return Err(invalid(format!(
                "H is {:?}, expected {:?}",
                h.shape(),
                (self.rank, n)
            )));
        }
        if w.iter().chain(h.iter()).any(|x| !x.is_finite() || *x < 0.0) {
            return Err(invalid("negative or non-finite entries".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeding::{FixedSeeder, RandomSeeder};

    struct NegativeSeeder;

    impl Seeder for NegativeSeeder {
        fn name(&self) -> &str {
            "negative"
        }

        fn initialize(
            &self,
            v: &Mat,
            rank: usize,
            _rng: &mut SmallRng,
        ) -> anyhow::Result<(Mat, Mat)> {
            Ok((
                Mat::from_element(v.nrows(), rank, -1.0),
                Mat::from_element(rank, v.ncols(), 1.0),
            ))
        }
    }

    #[test]
    fn bad_seed_is_reported() -> anyhow::Result<()> {
        let bd = Bd::new(Mat::from_element(3, 3, 1.0), 2, BdOptions::default())?;
        let err = bd.factorize(&NegativeSeeder, None).expect_err("negative seed");
        assert!(matches!(
            err.downcast_ref::<BdError>(),
            Some(BdError::InvalidSeed { .. })
        ));
        Ok(())
    }

    #[test]
    fn tracker_needs_more_than_one_run() -> anyhow::Result<()> {
        let opts = BdOptions {
            track: true,
            skip: 2,
            max_iter: Some(2),
            ..Default::default()
        };
        let bd = Bd::new(Mat::from_element(4, 3, 1.0), 2, opts)?;
        let out = bd.factorize(&RandomSeeder, None)?;
        assert!(out.tracker.is_none());
        Ok(())
    }

    #[test]
    fn sweeps_follow_skip_and_stride() -> anyhow::Result<()> {
        let opts = BdOptions {
            skip: 7,
            stride: 3,
            max_iter: Some(4),
            n_sigma: true,
            ..Default::default()
        };
        let v = Mat::from_element(4, 3, 1.0);
        let fixed = FixedSeeder {
            w: Mat::from_element(4, 2, 0.5),
            h: Mat::from_element(2, 3, 0.5),
        };
        let bd = Bd::new(v, 2, opts)?;
        let fit = bd.run_one(&fixed, 0)?;
        assert!(fit.n_iter >= 1 && fit.n_iter <= 5);
        assert_eq!(fit.n_sweeps, 7 + 3 * (fit.n_iter - 1));
        assert_eq!(fit.sigma, 1.0);
        Ok(())
    }
}
