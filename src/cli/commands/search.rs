use crate::bio::seqfile::read_queries;
use crate::cli::output;
use crate::core::config::{Config, MAX_RECOMMENDED_WORKERS};
use crate::report::output::{write_batch, RunOutput};
use crate::search::client::{QBlastClient, QBlastOptions};
use crate::search::scheduler::{BatchOptions, BatchScheduler};
use crate::storage::cache::FingerprintCache;
use crate::BlasterError;
use anyhow::Context;
use clap::Args;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Clone)]
pub struct SearchArgs {
    /// FASTA or FASTQ file with the sequences to search
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Remote database to search
    #[arg(short, long)]
    pub database: Option<String>,

    /// Number of concurrent searches
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Allow more concurrent searches than the service comfortably handles
    #[arg(long)]
    pub force: bool,

    /// Contact email sent to the search service
    #[arg(long, env = "BLASTER_EMAIL")]
    pub email: Option<String>,

    /// Cache directory for raw search results
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Alignments reported per sequence
    #[arg(long)]
    pub max_alignments: Option<usize>,

    /// High-scoring pairs reported per alignment
    #[arg(long)]
    pub max_hsps: Option<usize>,

    /// Directory for the run's output file
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

pub fn validate_email(email: &str) -> Result<(), BlasterError> {
    let valid = Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+$")
        .map(|re| re.is_match(email))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(BlasterError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )))
    }
}

pub fn validate_workers(workers: usize, force: bool) -> Result<(), BlasterError> {
    if workers < 1 {
        return Err(BlasterError::Validation(format!(
            "Concurrent requests must be at least 1, got {}",
            workers
        )));
    }
    if workers > MAX_RECOMMENDED_WORKERS && !force {
        return Err(BlasterError::Validation(format!(
            "{} concurrent requests is too many for the search service; use 1 to {} or pass --force",
            workers, MAX_RECOMMENDED_WORKERS
        )));
    }
    Ok(())
}

impl SearchArgs {
    /// Apply command line overrides on top of the loaded config
    pub fn apply(&self, mut config: Config) -> Result<Config, BlasterError> {
        if let Some(database) = &self.database {
            config.search.database = database.clone();
        }
        if let Some(workers) = self.workers {
            config.search.workers = workers;
        }
        if let Some(email) = &self.email {
            config.search.email = Some(email.clone());
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.search.cache_dir = Some(cache_dir.clone());
        }
        if let Some(max_alignments) = self.max_alignments {
            config.report.max_alignments = max_alignments;
        }
        if let Some(max_hsps) = self.max_hsps {
            config.report.max_hsps = max_hsps;
        }
        if let Some(output_dir) = &self.output_dir {
            config.report.output_dir = Some(output_dir.clone());
        }

        validate_workers(config.search.workers, self.force)?;
        if let Some(email) = &config.search.email {
            validate_email(email)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn scheduler(config: &Config, cache_only: bool) -> anyhow::Result<BatchScheduler> {
    let client = QBlastClient::new(QBlastOptions::from(&config.search))
        .context("Failed to set up the search client")?;
    let options = BatchOptions {
        cache_only,
        ..BatchOptions::from(config)
    };
    Ok(BatchScheduler::new(
        FingerprintCache::new(config.cache_dir()),
        Arc::new(client),
        options,
    ))
}

fn check_input(path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        return Err(BlasterError::Validation(format!(
            "Invalid input file '{}'; select an existing file",
            path.display()
        ))
        .into());
    }
    Ok(())
}

/// Search every sequence that is not cached yet
pub fn process(args: &SearchArgs, config: &Config) -> anyhow::Result<()> {
    check_input(&args.input)?;
    let queries = read_queries(&args.input)?;
    if config.search.email.is_none() {
        output::warning("No contact email configured; NCBI asks for one with every search");
    }
    output::action(&format!(
        "Searching {} sequences against '{}' with {} workers",
        queries.len(),
        config.search.database,
        config.search.workers
    ));

    let mut failed = 0;
    let mut done = 0;
    for result in scheduler(config, false)?.run(queries)? {
        match result.outcome {
            Ok(_) => done += 1,
            Err(e) => {
                failed += 1;
                output::error(&format!("{}: {}", result.query.prefix(10), e));
            }
        }
    }

    if failed == 0 {
        output::success(&format!("Processing done, {} sequences cached", done));
    } else {
        output::warning(&format!(
            "Processing done, {} sequences cached, {} failed (rerun to retry them)",
            done, failed
        ));
    }
    Ok(())
}

/// Format cached results without touching the network
pub fn parse(args: &SearchArgs, config: &Config) -> anyhow::Result<()> {
    check_input(&args.input)?;
    let queries = read_queries(&args.input)?;

    let output_dir = config
        .report
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut run_output = RunOutput::create_in(&output_dir)?;

    let stream = scheduler(config, true)?.run(queries)?;
    let summary = write_batch(
        stream,
        &mut run_output,
        config.report.max_alignments,
        config.report.max_hsps,
    )?;

    output::success(&format!(
        "Parsing done, {} rows for {} sequences written to {}",
        summary.rows,
        summary.queries,
        run_output.path().display()
    ));
    if summary.no_result > 0 {
        output::warning(&format!(
            "{} sequences have no cached result; run 'blaster process' first",
            summary.no_result
        ));
    }
    if summary.failed > 0 {
        output::warning(&format!(
            "{} cached results could not be read",
            summary.failed
        ));
    }
    Ok(())
}

pub fn run(args: &SearchArgs, config: &Config) -> anyhow::Result<()> {
    process(args, config)?;
    parse(args, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SearchArgs {
        SearchArgs {
            input: PathBuf::from("reads.fastq"),
            database: Some("nt".to_string()),
            workers: Some(4),
            force: false,
            email: Some("someone@example.org".to_string()),
            cache_dir: None,
            max_alignments: Some(8),
            max_hsps: None,
            output_dir: None,
        }
    }

    #[test]
    fn test_overrides_applied() {
        let config = args().apply(Config::default()).unwrap();
        assert_eq!(config.search.database, "nt");
        assert_eq!(config.search.workers, 4);
        assert_eq!(config.report.max_alignments, 8);
        assert_eq!(config.report.max_hsps, 1);
    }

    #[test]
    fn test_worker_bounds() {
        assert!(validate_workers(0, true).is_err());
        assert!(validate_workers(11, false).is_err());
        assert!(validate_workers(11, true).is_ok());
        assert!(validate_workers(10, false).is_ok());
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("someone@example.org").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
    }
}
