//! skillpay - Skill qualification and hourly compensation CLI

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skillpay::app::{env_robot, AppContext};
use skillpay::cli::output::emit_robot_error;
use skillpay::cli::{Cli, Commands};
use skillpay::Result;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let robot = cli.robot || env_robot();
    init_tracing(&cli, robot);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if robot {
                // Robot mode: structured error on stdout
                emit_robot_error(&e);
            } else {
                eprintln!("Error: {e}");
                let suggestion = e.to_structured().suggestion;
                if !suggestion.is_empty() {
                    eprintln!("Hint: {suggestion}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Commands::Init(args) = &cli.command {
        return skillpay::cli::commands::init::run_without_context(cli, args);
    }
    let ctx = AppContext::from_cli(cli)?;
    skillpay::cli::commands::run(&ctx, &cli.command)
}

fn init_tracing(cli: &Cli, robot: bool) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,skillpay=info",
        1 => "info,skillpay=debug",
        2 => "debug,skillpay=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if robot {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
