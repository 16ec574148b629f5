//! Rectified-Gaussian sampler.
//!
//! Draws nonnegative values from a Gaussian with mean `m` and variance
//! `s`, truncated to `x >= 0` and tilted by an exponential prior
//! `exp(-l x)`. Sampling is an exact inverse-CDF transform split into two
//! numerically stable branches, with an exponential tail approximation
//! once the standardized tilt passes [`TAIL_THRESHOLD`].

use crate::common::*;
use rand::distr::Open01;
use special::Error as SpecialError;
use statrs::function::erf::erfc_inv;

/// Standardized tilt `A` above which `erfc(A)` is too small to invert
pub const TAIL_THRESHOLD: f64 = 26.0;

/// Map a uniform `u` in (0,1) to a rectified-Gaussian quantile.
///
/// * `m` - mean of the untruncated Gaussian
/// * `s` - variance of the untruncated Gaussian
/// * `l` - linear tilt (exponential prior rate)
/// * `u` - uniform draw
///
/// NaN, negative and infinite results are clamped to exactly zero.
pub fn rectified_gaussian_quantile(m: f64, s: f64, l: f64, u: f64) -> f64 {
    let a = (l * s - m) / (2.0 * s).sqrt();

    let x = if a > TAIL_THRESHOLD {
        -u.ln() / ((l * s - m) / s)
    } else {
        let r = a.abs().compl_error();
        let arg = if a < 0.0 {
            u * r - (2.0 * u + r - 2.0)
        } else {
            u * r
        };
        erfc_inv(arg) * (2.0 * s).sqrt() + m - l * s
    };

    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Sample a vector of independent rectified-Gaussian values.
///
/// * `m` - vector of means
/// * `s` - shared variance
/// * `l` - vector of tilts, same length as `m`
/// * `rng` - random number generator
pub fn sample_rectified_gaussian<R: Rng + ?Sized>(m: &DVec, s: f64, l: &DVec, rng: &mut R) -> DVec {
    debug_assert_eq!(m.len(), l.len());
    DVec::from_iterator(
        m.len(),
        m.iter().zip(l.iter()).map(|(&m_i, &l_i)| {
            let u: f64 = rng.sample(Open01);
            rectified_gaussian_quantile(m_i, s, l_i, u)
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn empirical_mean(m: f64, s: f64, l: f64, ndraw: usize, seed: u64) -> f64 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mm = DVec::from_element(ndraw, m);
        let ll = DVec::from_element(ndraw, l);
        let x = sample_rectified_gaussian(&mm, s, &ll, &mut rng);
        assert!(x.iter().all(|&v| v.is_finite() && v >= 0.0));
        x.mean()
    }

    #[test]
    fn standard_half_gaussian_mean() {
        let mean = empirical_mean(0.0, 1.0, 0.0, 200_000, 1);
        let expected = (2.0 / std::f64::consts::PI).sqrt();
        assert_abs_diff_eq!(mean, expected, epsilon = 0.01);
    }

    #[test]
    fn truncated_gaussian_means() {
        // E[X | X >= 0] = m + φ(m)/Φ(m) for X ~ N(m, 1)
        let mean = empirical_mean(1.0, 1.0, 0.0, 200_000, 2);
        assert_abs_diff_eq!(mean, 1.287_6, epsilon = 0.01);

        let mean = empirical_mean(3.0, 1.0, 0.0, 200_000, 3);
        assert_abs_diff_eq!(mean, 3.004_4, epsilon = 0.01);
    }

    #[test]
    fn large_tilt_concentrates_near_zero() {
        let mean = empirical_mean(0.0, 1.0, 50.0, 50_000, 4);
        assert!(mean < 0.05, "mean = {}", mean);
        assert_abs_diff_eq!(mean, 1.0 / 50.0, epsilon = 0.002);
    }

    #[test]
    fn tail_branch_uses_exponential_formula() {
        // A = (l s - m) / sqrt(2 s) = (60 + 5) / 2 > 26
        let (m, s, l) = (-5.0, 2.0, 30.0);
        for &u in &[1e-9, 0.1, 0.5, 0.9, 1.0 - 1e-12] {
            let expected = -f64::ln(u) / ((l * s - m) / s);
            assert_eq!(rectified_gaussian_quantile(m, s, l, u), expected);
        }
    }

    #[test]
    fn threshold_itself_uses_inverse_erfc() {
        // s = 0.5 so that A = l/2 - m; A == 26 exactly stays in the exact branch
        let (m, s, l, u) = (0.0, 0.5, 52.0, 0.3);
        let r = 26f64.compl_error();
        let expected = erfc_inv(u * r) + m - l * s;
        let x = rectified_gaussian_quantile(m, s, l, u);
        if expected.is_finite() && expected > 0.0 {
            assert_eq!(x, expected);
        } else {
            assert_eq!(x, 0.0);
        }

        let l_above = 52.000_001;
        let tail = -f64::ln(u) / ((l_above * s - m) / s);
        assert_eq!(rectified_gaussian_quantile(m, s, l_above, u), tail);
    }

    #[test]
    fn degenerate_inputs_clamp_to_zero() {
        assert_eq!(rectified_gaussian_quantile(0.0, 0.0, 0.0, 0.5), 0.0);
        assert_eq!(rectified_gaussian_quantile(f64::NAN, 1.0, 0.0, 0.5), 0.0);
        assert_eq!(rectified_gaussian_quantile(1.0, f64::INFINITY, 0.0, 0.5), 0.0);
        assert_eq!(rectified_gaussian_quantile(f64::INFINITY, 1.0, 0.0, 0.5), 0.0);
    }

    #[test]
    fn outputs_never_negative_on_a_grid() {
        for &m in &[-100.0, -3.0, -0.1, 0.0, 0.1, 3.0, 100.0] {
            for &s in &[1e-12, 1e-3, 1.0, 1e3] {
                for &l in &[-1.0, 0.0, 1.0, 1e3] {
                    for &u in &[1e-15, 0.25, 0.5, 0.75, 1.0 - 1e-15] {
                        let x = rectified_gaussian_quantile(m, s, l, u);
                        assert!(x.is_finite() && x >= 0.0, "{} {} {} {} -> {}", m, s, l, u, x);
                    }
                }
            }
        }
    }
}
