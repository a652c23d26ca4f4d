pub mod bio;
pub mod cli;
pub mod core;
pub mod report;
pub mod search;
pub mod storage;
pub mod sync;
pub mod utils;

pub use crate::bio::sequence::Query;
pub use crate::report::formatter::{format_report, FormattedRow};
pub use crate::search::scheduler::BatchScheduler;
pub use crate::storage::cache::{CacheEntry, FingerprintCache};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No result available for {0}")]
    NoResult(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Checksum mismatch for {file}: expected {expected}, computed {computed}")]
    Checksum {
        file: String,
        expected: String,
        computed: String,
    },

    #[error("Metadata version {0} is not supported; support for this schema must be added before proceeding")]
    UnsupportedMetadata(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, BlasterError>;

impl From<serde_json::Error> for BlasterError {
    fn from(err: serde_json::Error) -> Self {
        BlasterError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for BlasterError {
    fn from(err: reqwest::Error) -> Self {
        BlasterError::Network(err.to_string())
    }
}
