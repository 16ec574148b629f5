//! Bayesian Decomposition (BD): Gibbs sampling for nonnegative matrix
//! factorization `V ~ W H`.
//!
//! The entries of `W` and `H` carry exponential priors and the Gaussian
//! noise an inverse-Gamma prior, so every Gibbs conditional is either a
//! rectified Gaussian (one column of `W`, one row of `H`) or an
//! inverse-Gamma (the noise variance).
//!
//! ```no_run
//! use lentil::{Bd, BdOptions, RandomSeeder};
//!
//! # fn main() -> anyhow::Result<()> {
//! let v = nalgebra::DMatrix::<f64>::from_element(4, 3, 1.0);
//! let bd = Bd::new(v, 2, BdOptions::default())?;
//! let out = bd.factorize(&RandomSeeder, None)?;
//! println!("{}", out.fit.final_obj);
//! # Ok(())
//! # }
//! ```

pub mod bd;
pub mod common;
pub mod convergence;
pub mod error;
pub mod fit;
pub mod gibbs;
pub mod options;
pub mod rectified_gaussian;
pub mod seeding;
pub mod sufficient_stats;
pub mod tracker;

pub use bd::{Bd, BdOutput};
pub use convergence::{ConvergenceMonitor, RunState, StopReason};
pub use error::BdError;
pub use fit::BdFit;
pub use options::{BdOptions, BdPriors};
pub use seeding::{
    FixedSeeder, NndsvdSeeder, RandomCSeeder, RandomSeeder, RandomVcolSeeder, Seeder,
};
pub use tracker::{RunTracker, Tracker};
