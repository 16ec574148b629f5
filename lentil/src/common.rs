pub use log::{debug, info, warn};

pub use rand::rngs::SmallRng;
pub use rand::{Rng, SeedableRng};

pub type Mat = nalgebra::DMatrix<f64>;
pub type DVec = nalgebra::DVector<f64>;

pub use crate::error::BdError;

pub const DEFAULT_MAX_ITER: usize = 30;
pub const DEFAULT_SKIP: usize = 100;
pub const DEFAULT_STRIDE: usize = 1;
pub const DEFAULT_SIGMA: f64 = 1.0;
pub const DEFAULT_SEED: u64 = 42;
