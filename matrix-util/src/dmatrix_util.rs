pub use nalgebra::{DMatrix, DVector};
pub use rand::Rng;
pub use rand_distr::{Exp, StandardNormal};

use crate::traits::SampleOps;
use num_traits::{Float, FromPrimitive};

fn cast<T: FromPrimitive + num_traits::Zero>(x: f64) -> T {
    T::from_f64(x).unwrap_or_else(T::zero)
}

impl<T> SampleOps for DMatrix<T>
where
    T: Float + FromPrimitive + nalgebra::Scalar + Send,
{
    type Mat = Self;
    type Scalar = T;

    fn runif_with<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        DMatrix::<T>::from_fn(dd, nn, |_, _| cast(rng.random::<f64>()))
    }

    fn rnorm_with<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        DMatrix::<T>::from_fn(dd, nn, |_, _| cast(rng.sample::<f64, _>(StandardNormal)))
    }

    fn rexp_with<R: Rng + ?Sized>(
        dd: usize,
        nn: usize,
        rate: Self::Scalar,
        rng: &mut R,
    ) -> anyhow::Result<Self::Mat> {
        let rate = rate
            .to_f64()
            .ok_or(anyhow::anyhow!("rate is not representable"))?;
        let pdf = Exp::new(rate).map_err(|e| anyhow::anyhow!("Exp({}): {}", rate, e))?;
        Ok(DMatrix::<T>::from_fn(dd, nn, |_, _| cast(rng.sample(pdf))))
    }
}
