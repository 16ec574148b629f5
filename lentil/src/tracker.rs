//! Recording of the terminal state of every run.

use crate::common::*;

/// Receives one terminal state per finished run
pub trait Tracker {
    fn add(&mut self, w: Mat, h: Mat, sigma: f64);
}

/// Terminal `(W, H, sigma^2)` of one run
#[derive(Debug, Clone)]
pub struct TrackedRun {
    pub w: Mat,
    pub h: Mat,
    pub sigma: f64,
}

/// Collected run states, in run order.
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    pub runs: Vec<TrackedRun>,
}

impl Tracker for RunTracker {
    fn add(&mut self, w: Mat, h: Mat, sigma: f64) {
        self.runs.push(TrackedRun { w, h, sigma });
    }
}

impl RunTracker {
    pub fn n_runs(&self) -> usize {
        self.runs.len()
    }

    /// Element-wise mean of `W` across runs
    pub fn basis_mean(&self) -> Option<Mat> {
        Self::mean_of(self.runs.iter().map(|r| &r.w))
    }

    /// Element-wise mean of `H` across runs
    pub fn mixture_mean(&self) -> Option<Mat> {
        Self::mean_of(self.runs.iter().map(|r| &r.h))
    }

    pub fn sigmas(&self) -> Vec<f64> {
        self.runs.iter().map(|r| r.sigma).collect()
    }

    pub fn sigma_mean(&self) -> Option<f64> {
        let n = self.n_runs();
        if n == 0 {
            return None;
        }
        Some(self.runs.iter().map(|r| r.sigma).sum::<f64>() / n as f64)
    }

    /// Quantile (0 <= q <= 1) of the noise variance across runs,
    /// linearly interpolated between order statistics
    pub fn sigma_quantile(&self, q: f64) -> Option<f64> {
        let n = self.n_runs();
        if n == 0 {
            return None;
        }
        let mut vals = self.sigmas();
        vals.sort_unstable_by(|a, b| a.total_cmp(b));
        let idx = (q * (n - 1) as f64).clamp(0.0, (n - 1) as f64);
        let lo = idx.floor() as usize;
        let hi = idx.ceil() as usize;
        if lo == hi {
            Some(vals[lo])
        } else {
            let frac = idx - lo as f64;
            Some(vals[lo] * (1.0 - frac) + vals[hi] * frac)
        }
    }

    fn mean_of<'a>(mut mats: impl Iterator<Item = &'a Mat>) -> Option<Mat> {
        let mut sum = mats.next()?.clone();
        let mut n = 1.0;
        for x in mats {
            sum += x;
            n += 1.0;
        }
        Some(sum / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_across_runs() {
        let mut tracker = RunTracker::default();
        assert!(tracker.basis_mean().is_none());
        assert!(tracker.sigma_quantile(0.5).is_none());

        tracker.add(Mat::from_element(2, 1, 1.0), Mat::from_element(1, 3, 0.0), 1.0);
        tracker.add(Mat::from_element(2, 1, 3.0), Mat::from_element(1, 3, 2.0), 3.0);
        tracker.add(Mat::from_element(2, 1, 5.0), Mat::from_element(1, 3, 4.0), 2.0);

        assert_eq!(tracker.n_runs(), 3);
        assert_eq!(tracker.basis_mean(), Some(Mat::from_element(2, 1, 3.0)));
        assert_eq!(tracker.mixture_mean(), Some(Mat::from_element(1, 3, 2.0)));
        assert_eq!(tracker.sigma_mean(), Some(2.0));
        assert_eq!(tracker.sigma_quantile(0.5), Some(2.0));
        assert_eq!(tracker.sigma_quantile(0.25), Some(1.5));
        assert_eq!(tracker.sigma_quantile(1.0), Some(3.0));
    }
}
