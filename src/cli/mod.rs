pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "blaster",
    version,
    about = "Batch nucleotide sequences through NCBI BLAST with an on-disk result cache",
    long_about = "Blaster submits every sequence of a FASTA or FASTQ file to the NCBI BLAST \
                  service, caches each raw report under a fingerprint of its sequence, and \
                  writes ranked match rows (accession, coverage, identity, length, title). \
                  It can also download and verify BLAST reference databases."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to $BLASTER_HOME/config.toml)
    #[arg(long, global = true, env = "BLASTER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search every sequence remotely and populate the cache
    Process(commands::search::SearchArgs),

    /// Format cached results into a timestamped output file
    Parse(commands::search::SearchArgs),

    /// Process, then parse
    Run(commands::search::SearchArgs),

    /// Manage BLAST reference databases
    Database(commands::database::DatabaseArgs),

    /// Show or initialise the configuration
    Config(commands::config::ConfigArgs),
}
