use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget};
use lentil::common::*;
use lentil::*;
use matrix_util::common_io::{mkdir, write_lines, Delimiter};
use matrix_util::traits::IoOps;

#[derive(ValueEnum, Clone, Debug, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum SeedMethod {
    Random,
    Fixed,
    Nndsvd,
    RandomC,
    RandomVcol,
}

#[derive(Args, Debug)]
pub struct FitArgs {
    /// Nonnegative data matrix (rows = features, columns = samples),
    /// delimited text, optionally gzipped
    #[arg(required = true)]
    data_file: Box<str>,

    /// Factorization rank
    #[arg(short = 'k', long, required = true)]
    rank: usize,

    /// Output header
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// Column delimiter (default: tab, space or comma)
    #[arg(long)]
    delim: Option<char>,

    /// The first non-comment line of every input matrix is a header
    #[arg(long, default_value_t = false)]
    header: bool,

    /// Number of independent runs
    #[arg(long, default_value_t = 1)]
    n_run: usize,

    /// Maximum number of iterations per run
    #[arg(long, default_value_t = DEFAULT_MAX_ITER)]
    max_iter: usize,

    /// Do not cap the number of iterations
    #[arg(long, default_value_t = false)]
    no_max_iter: bool,

    /// Stop once the objective change `curr - prev` is this much or less
    #[arg(long)]
    min_residuals: Option<f64>,

    /// Prior tilt on W (rows x rank)
    #[arg(long)]
    alpha_file: Option<Box<str>>,

    /// Prior tilt on H (rank x columns)
    #[arg(long)]
    beta_file: Option<Box<str>>,

    /// Scale term of the inverse-Gamma noise prior
    #[arg(long, default_value_t = 0.0)]
    theta: f64,

    /// Shape term of the inverse-Gamma noise prior
    #[arg(long, default_value_t = 0.0)]
    noise_k: f64,

    /// Initial noise variance
    #[arg(long, default_value_t = DEFAULT_SIGMA)]
    sigma: f64,

    /// Burn-in sweeps in the first iteration
    #[arg(long, default_value_t = DEFAULT_SKIP)]
    skip: usize,

    /// Sweeps per later iteration
    #[arg(long, default_value_t = DEFAULT_STRIDE)]
    stride: usize,

    /// Columns of W held fixed (comma-separated, 0-based)
    #[arg(long, value_delimiter(','))]
    fix_w: Option<Vec<usize>>,

    /// Rows of H held fixed (comma-separated, 0-based)
    #[arg(long, value_delimiter(','))]
    fix_h: Option<Vec<usize>>,

    /// Hold the noise variance fixed
    #[arg(long, default_value_t = false)]
    fix_sigma: bool,

    /// Keep W and H of every run and write their means
    #[arg(long, default_value_t = false)]
    track: bool,

    /// Evaluate the objective every `test_conv` iterations
    #[arg(long)]
    test_conv: Option<usize>,

    /// Random seed; run `r` uses `seed + r`
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Run the chains in parallel
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Initialization of W and H
    #[arg(long, value_enum, default_value = "random")]
    seed_method: SeedMethod,

    /// Initial W for `--seed-method fixed`
    #[arg(long)]
    init_w: Option<Box<str>>,

    /// Initial H for `--seed-method fixed`
    #[arg(long)]
    init_h: Option<Box<str>>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

impl FitArgs {
    fn delimiter(&self) -> Delimiter {
        match self.delim {
            Some(c) => Delimiter::Chars(vec![c]),
            None => Delimiter::Chars(vec!['\t', ' ', ',']),
        }
    }

    fn read_matrix(&self, file: &str) -> anyhow::Result<Mat> {
        let skip = self.header.then_some(0);
        Mat::read_file_delim(file, self.delimiter(), skip)
    }

    fn read_optional(&self, file: &Option<Box<str>>) -> anyhow::Result<Option<Mat>> {
        file.as_deref().map(|f| self.read_matrix(f)).transpose()
    }

    fn seeder(&self) -> anyhow::Result<Box<dyn Seeder>> {
        Ok(match self.seed_method {
            SeedMethod::Random => Box::new(RandomSeeder),
            SeedMethod::Nndsvd => Box::new(NndsvdSeeder),
            SeedMethod::RandomC => Box::new(RandomCSeeder),
            SeedMethod::RandomVcol => Box::new(RandomVcolSeeder),
            SeedMethod::Fixed => {
                let (Some(w), Some(h)) = (self.init_w.as_deref(), self.init_h.as_deref()) else {
                    return Err(BdError::InvalidConfig(
                        "`--seed-method fixed` needs both --init-w and --init-h".into(),
                    )
                    .into());
                };
                Box::new(FixedSeeder {
                    w: self.read_matrix(w)?,
                    h: self.read_matrix(h)?,
                })
            }
        })
    }

    fn options(&self) -> anyhow::Result<BdOptions> {
        Ok(BdOptions {
            n_run: self.n_run,
            max_iter: (!self.no_max_iter).then_some(self.max_iter),
            min_residuals: self.min_residuals,
            alpha: self.read_optional(&self.alpha_file)?,
            beta: self.read_optional(&self.beta_file)?,
            theta: self.theta,
            k: self.noise_k,
            sigma: self.sigma,
            skip: self.skip,
            stride: self.stride,
            n_w: fixed_mask("fix-w", &self.fix_w, self.rank)?,
            n_h: fixed_mask("fix-h", &self.fix_h, self.rank)?,
            n_sigma: self.fix_sigma,
            track: self.track,
            test_conv: self.test_conv,
            seed: self.seed,
            parallel: self.parallel,
        })
    }
}

/// Turn 0-based indices into a freeze mask of length `rank`
fn fixed_mask(
    name: &str,
    indices: &Option<Vec<usize>>,
    rank: usize,
) -> anyhow::Result<Option<Vec<bool>>> {
    let Some(indices) = indices else {
        return Ok(None);
    };
    let mut mask = vec![false; rank];
    for &i in indices {
        if i >= rank {
            return Err(BdError::InvalidConfig(format!(
                "--{}: index {} out of range for rank {}",
                name, i, rank
            ))
            .into());
        }
        mask[i] = true;
    }
    Ok(Some(mask))
}

pub fn run_fit(args: &FitArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    mkdir(&args.out)?;

    let v = args.read_matrix(&args.data_file)?;
    info!("Read {} x {} data from {}", v.nrows(), v.ncols(), args.data_file);

    let seeder = args.seeder()?;
    let bd = Bd::new(v, args.rank, args.options()?)?;

    let pb = ProgressBar::new(args.n_run as u64);
    if args.verbose {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    let mut run_lines: Vec<Box<str>> =
        vec!["run\tobjective\tn_iter\tn_sweeps\tsigma\tevar\tstop".into()];

    let mut on_run = |fit: &BdFit| {
        run_lines.push(
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                fit.run,
                fit.final_obj,
                fit.n_iter,
                fit.n_sweeps,
                fit.sigma,
                fit.evar(bd.target()),
                fit.stop_reason.map_or("-".to_string(), |r| r.to_string())
            )
            .into_boxed_str(),
        );
        pb.inc(1);
    };

    let callback: &mut dyn FnMut(&BdFit) = &mut on_run;
    let out = bd.factorize(seeder.as_ref(), Some(callback))?;
    pb.finish_and_clear();

    let fit = &out.fit;
    let (sparse_w, sparse_h) = fit.sparseness();

    fit.basis().to_tsv(&format!("{}.basis.tsv.gz", args.out))?;
    fit.coef().to_tsv(&format!("{}.mixture.tsv.gz", args.out))?;
    write_lines(&run_lines, &format!("{}.runs.tsv", args.out))?;

    let mut tracked = serde_json::Value::Null;
    if let Some(tracker) = out.tracker.as_ref() {
        if let Some(w_mean) = tracker.basis_mean() {
            w_mean.to_tsv(&format!("{}.basis_mean.tsv.gz", args.out))?;
        }
        if let Some(h_mean) = tracker.mixture_mean() {
            h_mean.to_tsv(&format!("{}.mixture_mean.tsv.gz", args.out))?;
        }
        tracked = serde_json::json!({
            "n_runs": tracker.n_runs(),
            "sigma_mean": tracker.sigma_mean(),
            "sigma_q05": tracker.sigma_quantile(0.05),
            "sigma_q50": tracker.sigma_quantile(0.5),
            "sigma_q95": tracker.sigma_quantile(0.95),
        });
    }

    let param_file = format!("{}.parameters.json", args.out);
    let params = serde_json::json!({
        "command": "fit",
        "data_file": args.data_file,
        "rows": bd.target().nrows(),
        "cols": bd.target().ncols(),
        "rank": args.rank,
        "seed_method": seeder.name(),
        "n_run": args.n_run,
        "max_iter": bd.options().max_iter,
        "min_residuals": args.min_residuals,
        "theta": args.theta,
        "k": args.noise_k,
        "sigma": args.sigma,
        "skip": args.skip,
        "stride": args.stride,
        "fix_w": args.fix_w,
        "fix_h": args.fix_h,
        "fix_sigma": args.fix_sigma,
        "test_conv": args.test_conv,
        "seed": args.seed,
        "parallel": args.parallel,
        "final": {
            "run": fit.run,
            "objective": fit.final_obj,
            "rss": fit.rss(bd.target()),
            "evar": fit.evar(bd.target()),
            "sigma": fit.sigma,
            "n_iter": fit.n_iter,
            "n_sweeps": fit.n_sweeps,
            "stop": fit.stop_reason.map(|r| r.to_string()),
            "sparseness_w": sparse_w,
            "sparseness_h": sparse_h,
        },
        "tracker": tracked,
    });
    std::fs::write(&param_file, serde_json::to_string_pretty(&params)?)?;
    info!("Wrote parameters: {}", param_file);

    Ok(())
}
