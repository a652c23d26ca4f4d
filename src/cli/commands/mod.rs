pub mod config;
pub mod database;
pub mod search;

use crate::core::config::{load_or_default, Config};
use crate::core::paths;
use std::path::Path;

/// Load the config file named on the command line, or the default location
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(paths::config_path);
    Ok(load_or_default(&path)?)
}
