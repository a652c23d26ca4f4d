use crate::cli::output;
use crate::core::config::{save_config, Config};
use crate::core::paths;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration and resolved paths
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs, config: &Config, config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(paths::config_path);
    match args.command {
        ConfigCommands::Show => show(config, &path),
        ConfigCommands::Init { force } => init(&path, force),
    }
}

fn show(config: &Config, path: &PathBuf) -> anyhow::Result<()> {
    output::section_header("Configuration");
    let state = if path.exists() { "" } else { " (not created, using defaults)" };
    println!("# {}{}", path.display(), state);
    println!("{}", toml::to_string_pretty(config)?);
    output::section_header("Paths");
    println!("{}", paths::describe_paths());
    Ok(())
}

fn init(path: &PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    save_config(path, &Config::default())?;
    output::success(&format!("Wrote default config to {}", path.display()));
    Ok(())
}
