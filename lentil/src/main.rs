mod run_fit;
mod run_simulate;

use clap::{Parser, Subcommand};
use log::info;
use run_fit::*;
use run_simulate::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LENTIL",
    long_about = "Bayesian Decomposition of a nonnegative matrix V ~ W H\n\
		  by Gibbs sampling with exponential priors on W and H\n\
		  and an inverse-Gamma prior on the noise variance.",
    term_width = 80
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Factorize a nonnegative data matrix",
        long_about = "Run one or more Gibbs chains on a nonnegative matrix:\n\
		      (1) Initialize W and H by the chosen seeding method\n\
		      (2) Burn in for `skip` sweeps, then `stride` sweeps per iteration\n\
		      (3) Stop at `max_iter` or when the squared error stops improving.\n"
    )]
    Fit(FitArgs),

    /// Simulate `V = W H + noise` with exponential `W` and `H`
    Simulate(SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Fit(args) => {
            run_fit(args)?;
        }
        Commands::Simulate(args) => {
            run_simulate(args)?;
        }
    }

    info!("Done");
    Ok(())
}
