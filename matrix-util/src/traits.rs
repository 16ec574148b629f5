use crate::common_io::Delimiter;
use rand::Rng;

/// Operations to sample random matrices
pub trait SampleOps {
    type Mat;
    type Scalar;

    /// Sample a matrix from `U(0,1)` with a caller-owned generator
    fn runif_with<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;

    /// Sample a matrix from `N(0,1)` with a caller-owned generator
    fn rnorm_with<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;

    /// Sample a matrix from an exponential distribution with `rate`
    ///
    /// $$f(x|\lambda) = \lambda e^{-\lambda x}$$
    fn rexp_with<R: Rng + ?Sized>(
        dd: usize,
        nn: usize,
        rate: Self::Scalar,
        rng: &mut R,
    ) -> anyhow::Result<Self::Mat>;
}

/// Read and write matrices from and to files
pub trait IoOps {
    type Scalar;
    type Mat;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat>;

    fn from_tsv(tsv_file: &str, skip: Option<usize>) -> anyhow::Result<Self::Mat> {
        Self::read_file_delim(tsv_file, "\t", skip)
    }

    fn write_file_delim(&self, file: &str, delim: &str) -> anyhow::Result<()>;

    fn to_tsv(&self, tsv_file: &str) -> anyhow::Result<()> {
        self.write_file_delim(tsv_file, "\t")
    }
}
