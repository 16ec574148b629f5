//! Stopping logic of a single run.
//!
//! The monitor keeps the previous and current squared-error objective
//! and decides, before every outer iteration, whether sampling goes on.

use crate::common::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// iteration counter went past `max_iter`
    MaxIter,
    /// `cobj - pobj` fell to `min_residuals` or below
    MinResiduals,
    /// the objective did not decrease
    NoImprovement,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::MaxIter => "max_iter",
            StopReason::MinResiduals => "min_residuals",
            StopReason::NoImprovement => "no_improvement",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    max_iter: Option<usize>,
    min_residuals: Option<f64>,
    test_conv: Option<usize>,
    state: RunState,
    stop_reason: Option<StopReason>,
    iter: usize,
    pobj: f64,
    cobj: f64,
}

impl ConvergenceMonitor {
    /// Start at iteration 0 with `pobj = cobj = initial_obj`
    pub fn new(
        initial_obj: f64,
        max_iter: Option<usize>,
        min_residuals: Option<f64>,
        test_conv: Option<usize>,
    ) -> Self {
        Self {
            max_iter,
            min_residuals,
            test_conv,
            state: RunState::Running,
            stop_reason: None,
            iter: 0,
            pobj: initial_obj,
            cobj: initial_obj,
        }
    }

    /// Evaluate the stopping predicate; once stopped, stays stopped.
    ///
    /// Both objective rules compare `cobj` against `pobj` as they stand,
    /// so an iteration that reused a stale objective (`cobj == pobj`)
    /// ends the run.
    pub fn should_continue(&mut self) -> bool {
        if self.state == RunState::Stopped {
            return false;
        }

        let reason = if self.max_iter.is_some_and(|max_iter| self.iter > max_iter) {
            Some(StopReason::MaxIter)
        } else if self.iter > 0 {
            if self
                .min_residuals
                .is_some_and(|eps| self.cobj - self.pobj <= eps)
            {
                Some(StopReason::MinResiduals)
            } else if self.cobj >= self.pobj {
                Some(StopReason::NoImprovement)
            } else {
                None
            }
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(
                "stop at iteration {}: {} (prev = {}, curr = {})",
                self.iter, reason, self.pobj, self.cobj
            );
            self.state = RunState::Stopped;
            self.stop_reason = Some(reason);
        }

        self.state == RunState::Running
    }

    /// Close one outer iteration. `objective` is called only when the
    /// objective is due for re-evaluation; otherwise the stale value is kept.
    pub fn advance<F>(&mut self, objective: F)
    where
        F: FnOnce() -> f64,
    {
        self.pobj = self.cobj;
        if self.test_conv.is_none_or(|every| self.iter % every == 0) {
            self.cobj = objective();
        }
        debug!("[{}] objective: {}", self.iter, self.cobj);
        self.iter += 1;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Number of completed outer iterations
    pub fn iterations(&self) -> usize {
        self.iter
    }

    pub fn current_objective(&self) -> f64 {
        self.cobj
    }

    pub fn previous_objective(&self) -> f64 {
        self.pobj
    }
}
