use aura::cli::{self, Cli, Commands};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    match &cli.command {
        Some(Commands::Run(args)) => cli::run(&cli, args).await,
        Some(Commands::Personas) => cli::personas(&cli),
        Some(Commands::Config(args)) => cli::config(args),
        None => match aura::repl::run(&cli).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
