//! Error types for Bayesian Decomposition.

use thiserror::Error;

/// Failures that abort a factorization job or a single run.
///
/// Numerical degeneracy inside the rectified-Gaussian sampler is not an
/// error: those draws are clamped to zero where they happen.
#[derive(Debug, Clone, Error)]
pub enum BdError {
    /// A configuration value is out of its admissible range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A prior or freeze mask does not match the (m, n, rank) of the job.
    #[error("shape mismatch for `{name}`: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// A seeder returned factors of the wrong shape or with negative entries.
    #[error("seeder `{seeder}` returned invalid factors: {reason}")]
    InvalidSeed { seeder: String, reason: String },

    /// The inverse-Gamma conditional of the noise variance is degenerate.
    #[error(
        "cannot sample noise variance in run {run}: shape = {shape}, scale = {scale} \
	 (theta = {theta}, k = {k}, error term = {error_term})"
    )]
    NoiseVariance {
        run: usize,
        shape: f64,
        scale: f64,
        theta: f64,
        k: f64,
        error_term: f64,
    },

    /// The cancel flag was raised between two sweeps.
    #[error("sampling cancelled in run {run} after {sweeps} sweeps")]
    Cancelled { run: usize, sweeps: usize },
}
