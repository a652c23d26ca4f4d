use blaster::cli::commands::{self, search::SearchArgs};
use blaster::cli::{Cli, Commands};
use blaster::BlasterError;
use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // BLASTER_LOG wins over -v
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let log_level = std::env::var("BLASTER_LOG").unwrap_or_else(|_| default_level.to_string());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<BlasterError>() {
            Some(BlasterError::Config(_)) => 2,
            Some(BlasterError::Io(_)) => 3,
            Some(BlasterError::Format(_))
            | Some(BlasterError::Validation(_))
            | Some(BlasterError::Parse(_)) => 4,
            Some(BlasterError::Network(_))
            | Some(BlasterError::Checksum { .. })
            | Some(BlasterError::UnsupportedMetadata(_))
            | Some(BlasterError::Database(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn search_config(args: &SearchArgs, cli_config: Option<&std::path::Path>) -> anyhow::Result<blaster::core::Config> {
    let config = commands::load_config(cli_config)?;
    Ok(args.apply(config)?)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => {
            commands::search::process(&args, &search_config(&args, config_path)?)
        }
        Commands::Parse(args) => commands::search::parse(&args, &search_config(&args, config_path)?),
        Commands::Run(args) => commands::search::run(&args, &search_config(&args, config_path)?),
        Commands::Database(args) => {
            let config = commands::load_config(config_path)?;
            commands::database::run(args, &config)
        }
        Commands::Config(args) => {
            let config = commands::load_config(config_path)?;
            commands::config::run(args, &config, config_path)
        }
    }
}
