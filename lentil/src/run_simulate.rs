use clap::Args;
use lentil::common::*;
use matrix_util::common_io::mkdir;
use matrix_util::traits::{IoOps, SampleOps};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of rows of `V`
    #[arg(long, short = 'm', default_value_t = 100)]
    rows: usize,

    /// Number of columns of `V`
    #[arg(long, short = 'n', default_value_t = 50)]
    cols: usize,

    /// True rank
    #[arg(short = 'k', long, default_value_t = 3)]
    rank: usize,

    /// Rate of the exponential entries of `W` and `H`
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Standard deviation of the Gaussian noise
    #[arg(long, default_value_t = 0.1)]
    noise_sd: f64,

    /// Random seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Output header
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

/// Draw `V = max(W H + E, 0)` with exponential `W`, `H` and Gaussian `E`
pub fn simulate_data(args: &SimulateArgs, rng: &mut SmallRng) -> anyhow::Result<(Mat, Mat, Mat)> {
    if args.rows == 0 || args.cols == 0 || args.rank == 0 {
        return Err(BdError::InvalidConfig("rows, cols and rank must be positive".into()).into());
    }
    if !(args.noise_sd.is_finite() && args.noise_sd >= 0.0) {
        return Err(
            BdError::InvalidConfig(format!("invalid noise sd {}", args.noise_sd)).into(),
        );
    }

    let w = Mat::rexp_with(args.rows, args.rank, args.rate, rng)?;
    let h = Mat::rexp_with(args.rank, args.cols, args.rate, rng)?;
    let noise = Mat::rnorm_with(args.rows, args.cols, rng) * args.noise_sd;
    let v = (&w * &h + noise).map(|x| x.max(0.0));
    Ok((v, w, h))
}

pub fn run_simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    mkdir(&args.out)?;

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let (v, w, h) = simulate_data(args, &mut rng)?;

    v.to_tsv(&format!("{}.data.tsv.gz", args.out))?;
    w.to_tsv(&format!("{}.basis.tsv.gz", args.out))?;
    h.to_tsv(&format!("{}.mixture.tsv.gz", args.out))?;
    info!("Simulated {} x {} data of rank {}", v.nrows(), v.ncols(), args.rank);

    let param_file = format!("{}.parameters.json", args.out);
    let params = serde_json::json!({
        "command": "simulate",
        "rows": args.rows,
        "cols": args.cols,
        "rank": args.rank,
        "rate": args.rate,
        "noise_sd": args.noise_sd,
        "seed": args.seed,
    });
    std::fs::write(&param_file, serde_json::to_string_pretty(&params)?)?;
    info!("Wrote parameters: {}", param_file);

    Ok(())
}
