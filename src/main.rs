//! Zero-time cache demo
//!
//! Runs the visibility harness against direct reads and coalesced reads.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use zerotime_cache::{
    Result,
    cli::{Cli, Command, DemoArgs},
    config::Config,
    harness, setup_tracing,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let outcome = Config::load(cli.config.as_deref()).and_then(|config| match cli.command {
        Some(Command::Config) => print_config(&config),
        Some(Command::Demo(args)) => run_demo(config, &args),
        None => run_demo(config, &DemoArgs::default()),
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn print_config(config: &Config) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}

fn run_demo(mut config: Config, args: &DemoArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    info!(
        workers = config.harness.workers,
        rounds = config.harness.rounds,
        coalescing_delay_ms = config.coalescing.delay.as_millis(),
        delay_ms = config.harness.delay.as_millis(),
        "Starting harness"
    );

    let reports = harness::compare(&config)?;
    print!("{}", harness::render(&reports, args.json)?);
    harness::verify(&reports)
}
