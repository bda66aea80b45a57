use ca_traffic::{launch, BernoulliSpawn, ConfigError, Inputs, SimResult};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "trafficsim")]
#[command(about = "Cellular automaton traffic simulation split across cooperating workers", long_about = None)]
struct Args {
    /// JSON file holding the simulation inputs
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Number of workers, each owning one segment of the road
    #[arg(short = 'n', long, default_value_t = 2)]
    workers: usize,

    /// Seed for the random number generators, overriding the config file
    #[arg(short, long)]
    seed: Option<u64>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn run(args: &Args) -> SimResult<()> {
    let mut inputs = Inputs::load(&args.config)?;
    if args.seed.is_some() {
        inputs.seed = args.seed;
    }

    println!("================================================");
    println!("||    CELLULAR AUTOMATA TRAFFIC SIMULATION    ||");
    println!("================================================");

    let spawner = BernoulliSpawn::new(inputs.prob_spawn).ok_or(ConfigError::Invalid {
        field: "prob_spawn",
        reason: "not a probability".into(),
    })?;
    let outcomes = launch(&inputs, args.workers, Box::new(spawner))?;
    if let Some(report) = outcomes.first().and_then(|outcome| outcome.report) {
        println!("{}", report);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut message = err.to_string();
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                message.push_str(&format!(": {}", cause));
                source = cause.source();
            }
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}
