use crate::cli::output::{self, format_size};
use crate::core::config::Config;
use crate::core::paths::REMOTE_DB_REGISTRY;
use crate::sync::disk::{available_space, gib_label, has_enough_space};
use crate::sync::{DatabaseSync, HttpTransport, RemoteRegistry};
use crate::utils::retry::RetryPolicy;
use crate::BlasterError;
use anyhow::Context;
use clap::{Args, Subcommand};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::fs;

#[derive(Args)]
pub struct DatabaseArgs {
    #[command(subcommand)]
    pub command: DatabaseCommands,
}

#[derive(Subcommand)]
pub enum DatabaseCommands {
    /// Refresh the list of databases offered by NCBI
    Fetch,

    /// List databases installed locally
    ListLocal,

    /// List databases offered by NCBI (fetches the list on first use)
    ListRemote,

    /// Download or update a database
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Database name as shown by list-remote
    pub name: String,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

fn syncer(config: &Config) -> anyhow::Result<DatabaseSync<HttpTransport>> {
    let transport = HttpTransport::new(RetryPolicy::with_retries(config.sync.retries))?;
    Ok(DatabaseSync::new(
        transport,
        config.sync.base_url.clone(),
        config.databases_dir(),
        config.sync.use_ftp,
    ))
}

fn registry(config: &Config) -> RemoteRegistry {
    RemoteRegistry::load(config.databases_dir().join(REMOTE_DB_REGISTRY))
}

pub fn run(args: DatabaseArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        DatabaseCommands::Fetch => fetch(config),
        DatabaseCommands::ListLocal => list_local(config),
        DatabaseCommands::ListRemote => list_remote(config),
        DatabaseCommands::Update(update_args) => update(update_args, config),
    }
}

fn fetch(config: &Config) -> anyhow::Result<()> {
    let mut registry = registry(config);
    let count = syncer(config)?.refresh_registry(&mut registry)?;
    output::success(&format!(
        "Fetched {} remote databases into {}",
        count,
        registry.path().display()
    ));
    Ok(())
}

fn list_local(config: &Config) -> anyhow::Result<()> {
    let local = syncer(config)?.local_databases()?;
    output::section_header("Local databases");
    if local.is_empty() {
        output::empty(&format!(
            "No databases installed in {}",
            config.databases_dir().display()
        ));
    }
    for name in local {
        println!("  {}", name);
    }
    Ok(())
}

fn list_remote(config: &Config) -> anyhow::Result<()> {
    let sync = syncer(config)?;
    let mut registry = registry(config);
    if registry.is_empty() {
        output::info("No remote database list cached yet, fetching it");
        sync.refresh_registry(&mut registry)?;
    }

    let local = sync.local_databases()?;
    output::section_header("Remote databases");
    for database in registry.databases() {
        let installed = if local.contains(&database.name) {
            " [INSTALLED]"
        } else {
            ""
        };
        println!(
            "  {:<32} {:>4} GiB{}",
            database.name,
            gib_label(database.size_bytes),
            installed
        );
    }
    if let Some(fetched) = registry.last_fetched() {
        output::info(&format!(
            "List fetched {}; run 'blaster database fetch' to refresh it",
            fetched.format("%Y-%m-%d %H:%M")
        ));
    }
    Ok(())
}

fn confirm(prompt: &str, default: bool) -> anyhow::Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

fn update(args: UpdateArgs, config: &Config) -> anyhow::Result<()> {
    let sync = syncer(config)?;
    let mut registry = registry(config);
    if registry.is_empty() {
        sync.refresh_registry(&mut registry)?;
    }
    let database = registry.get(&args.name).cloned().ok_or_else(|| {
        BlasterError::Database(format!(
            "Unknown database '{}'; run 'blaster database list-remote' to see what is available",
            args.name
        ))
    })?;

    if !args.yes
        && !confirm(
            &format!(
                "Download '{}' ({} files, {})?",
                database.name,
                database.files.len(),
                format_size(database.size_bytes)
            ),
            true,
        )?
    {
        output::info("Update cancelled");
        return Ok(());
    }

    let databases_dir = config.databases_dir();
    fs::create_dir_all(&databases_dir)
        .with_context(|| format!("Failed to create {}", databases_dir.display()))?;
    match available_space(&databases_dir) {
        Some(free) if !has_enough_space(database.size_bytes, free) => {
            output::warning(&format!(
                "Only {} free in {}, '{}' needs {}",
                format_size(free),
                databases_dir.display(),
                database.name,
                format_size(database.size_bytes)
            ));
            if args.yes {
                return Err(BlasterError::Database(format!(
                    "Not enough disk space for '{}'",
                    database.name
                ))
                .into());
            }
            if !confirm("Continue anyway?", false)? {
                output::info("Update cancelled");
                return Ok(());
            }
        }
        Some(_) => {}
        None => output::warning("Could not determine free disk space"),
    }

    let summary = sync.update_database(&database)?;
    output::success(&format!(
        "'{}' is up to date ({} archives updated, {} already current)",
        database.name,
        summary.updated.len(),
        summary.skipped.len()
    ));
    Ok(())
}
