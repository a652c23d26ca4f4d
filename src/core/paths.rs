use std::path::PathBuf;
use std::sync::OnceLock;

// Resolved once per process
static BLASTER_HOME: OnceLock<PathBuf> = OnceLock::new();
static BLASTER_CACHE_DIR: OnceLock<PathBuf> = OnceLock::new();
static BLASTER_DATABASES_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Name of the local registry of remote databases
pub const REMOTE_DB_REGISTRY: &str = "remote_db_cache.json";

/// Get the Blaster home directory
/// Checks BLASTER_HOME environment variable, falls back to ${HOME}/.blaster
pub fn blaster_home() -> PathBuf {
    BLASTER_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("BLASTER_HOME") {
                PathBuf::from(path)
            } else {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".blaster")
            }
        })
        .clone()
}

/// Get the search result cache directory
/// Checks BLASTER_CACHE_DIR environment variable, falls back to BLASTER_HOME/cache
pub fn blaster_cache_dir() -> PathBuf {
    BLASTER_CACHE_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("BLASTER_CACHE_DIR") {
                PathBuf::from(path)
            } else {
                blaster_home().join("cache")
            }
        })
        .clone()
}

/// Get the reference database directory
/// Checks BLASTER_DATABASES_DIR environment variable, falls back to BLASTER_HOME/databases
pub fn blaster_databases_dir() -> PathBuf {
    BLASTER_DATABASES_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("BLASTER_DATABASES_DIR") {
                PathBuf::from(path)
            } else {
                blaster_home().join("databases")
            }
        })
        .clone()
}

/// Config file location, BLASTER_CONFIG wins over BLASTER_HOME/config.toml
pub fn config_path() -> PathBuf {
    std::env::var("BLASTER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| blaster_home().join("config.toml"))
}

pub fn describe_paths() -> String {
    format!(
        "Blaster Paths:\n  \
        Home: {}\n  \
        Cache: {}\n  \
        Databases: {}\n  \
        Config: {}",
        blaster_home().display(),
        blaster_cache_dir().display(),
        blaster_databases_dir().display(),
        config_path().display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths_nest_under_home_by_default() {
        if std::env::var("BLASTER_CACHE_DIR").is_err() && std::env::var("BLASTER_HOME").is_err() {
            assert!(blaster_cache_dir().ends_with(".blaster/cache"));
        }
        let description = describe_paths();
        assert!(description.contains("Cache:"));
        assert!(description.contains("Databases:"));
    }
}
