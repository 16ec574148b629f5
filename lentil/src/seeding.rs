//! Initialization of `(W, H)` at the start of every run.
//!
//! A [`Seeder`] receives the run's own generator so that runs stay
//! reproducible whether they execute sequentially or in parallel.

use crate::common::*;
use matrix_util::traits::SampleOps;

/// Produces initial nonnegative factors `W` (m x rank) and `H` (rank x n)
pub trait Seeder: Send + Sync {
    fn name(&self) -> &str;

    fn initialize(&self, v: &Mat, rank: usize, rng: &mut SmallRng) -> anyhow::Result<(Mat, Mat)>;
}

/// Uniform entries on `[0, max(V))`
#[derive(Debug, Clone, Default)]
pub struct RandomSeeder;

impl Seeder for RandomSeeder {
    fn name(&self) -> &str {
        "random"
    }

    fn initialize(&self, v: &Mat, rank: usize, rng: &mut SmallRng) -> anyhow::Result<(Mat, Mat)> {
        let vmax = v.max().max(0.0);
        let w = Mat::runif_with(v.nrows(), rank, rng) * vmax;
        let h = Mat::runif_with(rank, v.ncols(), rng) * vmax;
        Ok((w, h))
    }
}

/// The same user-supplied factors for every run
#[derive(Debug, Clone)]
pub struct FixedSeeder {
    pub w: Mat,
    pub h: Mat,
}

impl Seeder for FixedSeeder {
    fn name(&self) -> &str {
        "fixed"
    }

    fn initialize(&self, v: &Mat, rank: usize, _rng: &mut SmallRng) -> anyhow::Result<(Mat, Mat)> {
        let expected_w = (v.nrows(), rank);
        let expected_h = (rank, v.ncols());
        if self.w.shape() != expected_w {
            return Err(BdError::ShapeMismatch {
                name: "W",
                expected: expected_w,
                got: self.w.shape(),
            }
            .into());
        }
        if self.h.shape() != expected_h {
            return Err(BdError::ShapeMismatch {
                name: "H",
                expected: expected_h,
                got: self.h.shape(),
            }
            .into());
        }
        Ok((self.w.clone(), self.h.clone()))
    }
}

/// Nonnegative double singular value decomposition.
///
/// Boutsidis & Gallopoulos (2008). SVD based initialization: A head
/// start for nonnegative matrix factorization. Pattern Recognition.
#[derive(Debug, Clone, Default)]
pub struct NndsvdSeeder;

const NNDSVD_EPS: f64 = 1e-11;

fn positive_part(x: &DVec) -> DVec {
    x.map(|a| a.max(0.0))
}

fn negative_part(x: &DVec) -> DVec {
    x.map(|a| (-a).max(0.0))
}

fn unit(x: DVec, norm: f64) -> DVec {
    if norm > 0.0 {
        x / norm
    } else {
        x * 0.0
    }
}

impl Seeder for NndsvdSeeder {
    fn name(&self) -> &str {
        "nndsvd"
    }

    fn initialize(&self, v: &Mat, rank: usize, _rng: &mut SmallRng) -> anyhow::Result<(Mat, Mat)> {
        let (m, n) = v.shape();
        if rank > m.min(n) {
            return Err(BdError::InvalidConfig(format!(
                "nndsvd needs rank <= min(m, n) = {}, got {}",
                m.min(n),
                rank
            ))
            .into());
        }

        let svd = v.clone().svd(true, true);
        let uu = svd.u.ok_or(anyhow::anyhow!("svd: no left singular vectors"))?;
        let vt = svd.v_t.ok_or(anyhow::anyhow!("svd: no right singular vectors"))?;
        let dd = svd.singular_values;

        let mut order: Vec<usize> = (0..dd.len()).collect();
        order.sort_by(|&a, &b| dd[b].total_cmp(&dd[a]));

        let mut w = Mat::zeros(m, rank);
        let mut h = Mat::zeros(rank, n);

        for (i, &k) in order.iter().take(rank).enumerate() {
            let x: DVec = uu.column(k).clone_owned();
            let y: DVec = vt.row(k).transpose();

            let (u_vec, v_vec, scale) = if i == 0 {
                (x.abs(), y.abs(), dd[k].sqrt())
            } else {
                let (xp, xn) = (positive_part(&x), negative_part(&x));
                let (yp, yn) = (positive_part(&y), negative_part(&y));
                let (nxp, nxn) = (xp.norm(), xn.norm());
                let (nyp, nyn) = (yp.norm(), yn.norm());
                let termp = nxp * nyp;
                let termn = nxn * nyn;
                if termp >= termn {
                    (unit(xp, nxp), unit(yp, nyp), (dd[k] * termp).sqrt())
                } else {
                    (unit(xn, nxn), unit(yn, nyn), (dd[k] * termn).sqrt())
                }
            };

            w.set_column(i, &(u_vec * scale));
            h.set_row(i, &(v_vec * scale).transpose());
        }

        w.apply(|x| {
            if *x < NNDSVD_EPS {
                *x = 0.0
            }
        });
        h.apply(|x| {
            if *x < NNDSVD_EPS {
                *x = 0.0
            }
        });
        Ok((w, h))
    }
}

/// Mean of `p` columns drawn with replacement from `candidates`
fn mean_of_random_columns(v: &Mat, candidates: &[usize], p: usize, rng: &mut SmallRng) -> DVec {
    let mut ret = DVec::zeros(v.nrows());
    for _ in 0..p {
        let j = candidates[rng.random_range(0..candidates.len())];
        ret += v.column(j);
    }
    ret / p as f64
}

/// Mean of `p` rows drawn with replacement from `candidates`
fn mean_of_random_rows(v: &Mat, candidates: &[usize], p: usize, rng: &mut SmallRng) -> DVec {
    let mut ret = DVec::zeros(v.ncols());
    for _ in 0..p {
        let i = candidates[rng.random_range(0..candidates.len())];
        ret += v.row(i).transpose();
    }
    ret / p as f64
}

/// Each column of `W` averages `ceil(n/5)` random columns of `V`;
/// each row of `H` averages `ceil(m/5)` random rows of `V`.
#[derive(Debug, Clone, Default)]
pub struct RandomVcolSeeder;

impl Seeder for RandomVcolSeeder {
    fn name(&self) -> &str {
        "random_vcol"
    }

    fn initialize(&self, v: &Mat, rank: usize, rng: &mut SmallRng) -> anyhow::Result<(Mat, Mat)> {
        let (m, n) = v.shape();
        let (p_c, p_r) = (n.div_ceil(5), m.div_ceil(5));
        let cols: Vec<usize> = (0..n).collect();
        let rows: Vec<usize> = (0..m).collect();

        let mut w = Mat::zeros(m, rank);
        let mut h = Mat::zeros(rank, n);
        for i in 0..rank {
            w.set_column(i, &mean_of_random_columns(v, &cols, p_c, rng));
            h.set_row(i, &mean_of_random_rows(v, &rows, p_r, rng).transpose());
        }
        Ok((w, h))
    }
}

/// Like [`RandomVcolSeeder`] but draws only among the `ceil(n/2)`
/// longest columns and `ceil(m/2)` longest rows of `V`.
#[derive(Debug, Clone, Default)]
pub struct RandomCSeeder;

fn longest(norms: Vec<f64>, keep: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..norms.len()).collect();
    order.sort_by(|&a, &b| norms[b].total_cmp(&norms[a]));
    order.truncate(keep.max(1));
    order
}

impl Seeder for RandomCSeeder {
    fn name(&self) -> &str {
        "random_c"
    }

    fn initialize(&self, v: &Mat, rank: usize, rng: &mut SmallRng) -> anyhow::Result<(Mat, Mat)> {
        let (m, n) = v.shape();
        let (p_c, p_r) = (n.div_ceil(5), m.div_ceil(5));
        let (l_c, l_r) = (n.div_ceil(2), m.div_ceil(2));

        let top_cols = longest(v.column_iter().map(|c| c.norm()).collect(), l_c);
        let top_rows = longest(v.row_iter().map(|r| r.norm()).collect(), l_r);

        let mut w = Mat::zeros(m, rank);
        let mut h = Mat::zeros(rank, n);
        for i in 0..rank {
            w.set_column(i, &mean_of_random_columns(v, &top_cols, p_c, rng));
            h.set_row(i, &mean_of_random_rows(v, &top_rows, p_r, rng).transpose());
        }
        Ok((w, h))
    }
}
