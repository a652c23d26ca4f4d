use crate::BlasterError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for concurrent searches unless the operator forces more.
pub const MAX_RECOMMENDED_WORKERS: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub report: ReportConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Remote index to query (e.g. "nr", "nt")
    pub database: String,
    pub program: String,
    /// Ask the service for megablast acceleration
    pub megablast: bool,
    /// Never call the remote service, only read cached results
    pub cache_only: bool,
    /// Number of concurrent searches
    pub workers: usize,
    /// Cache root; defaults to the BLASTER_CACHE_DIR location
    pub cache_dir: Option<PathBuf>,
    /// Contact address sent with every request
    pub email: Option<String>,
    pub tool: String,
    pub service_url: String,
    pub poll_interval_secs: u64,
    pub min_request_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub max_alignments: usize,
    pub max_hsps: usize,
    /// Where run output files are written; defaults to the working directory
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub base_url: String,
    /// Extra attempts after the first failed download
    pub retries: u32,
    /// Keep ftp:// URLs as-is instead of rewriting them to https://.
    /// The built-in HTTP transport cannot speak FTP.
    pub use_ftp: bool,
    pub databases_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            database: "nr".to_string(),
            program: "blastn".to_string(),
            megablast: true,
            cache_only: false,
            workers: 1,
            cache_dir: None,
            email: None,
            tool: "blaster".to_string(),
            service_url: "https://blast.ncbi.nlm.nih.gov/Blast.cgi".to_string(),
            poll_interval_secs: 60,
            min_request_interval_secs: 10,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_alignments: 1,
            max_hsps: 1,
            output_dir: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ftp.ncbi.nlm.nih.gov/blast/db/".to_string(),
            retries: 2,
            use_ftp: false,
            databases_dir: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), BlasterError> {
        if self.search.workers == 0 {
            return Err(BlasterError::Config(
                "search.workers must be at least 1, got 0".to_string(),
            ));
        }
        if self.report.max_alignments == 0 {
            return Err(BlasterError::Config(
                "report.max_alignments must be at least 1, got 0".to_string(),
            ));
        }
        if self.report.max_hsps == 0 {
            return Err(BlasterError::Config(
                "report.max_hsps must be at least 1, got 0".to_string(),
            ));
        }
        if self.search.database.trim().is_empty() {
            return Err(BlasterError::Config(
                "search.database must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache root after applying the environment default
    pub fn cache_dir(&self) -> PathBuf {
        self.search
            .cache_dir
            .clone()
            .unwrap_or_else(crate::core::paths::blaster_cache_dir)
    }

    pub fn databases_dir(&self) -> PathBuf {
        self.sync
            .databases_dir
            .clone()
            .unwrap_or_else(crate::core::paths::blaster_databases_dir)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, BlasterError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| BlasterError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

/// Load the config file if it exists, defaults otherwise
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Config, BlasterError> {
    if path.as_ref().exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), BlasterError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| BlasterError::Config(format!("Failed to serialize config: {}", e)))?;
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
