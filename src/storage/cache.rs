/// On-disk cache of raw search responses, one file per query digest
use crate::bio::sequence::Digest;
use crate::BlasterError;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

pub const CACHE_EXTENSION: &str = "xml";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    Absent,
    /// Placeholder left by a cache-only miss or an interrupted search
    Empty,
    Populated(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct FingerprintCache {
    root: PathBuf,
}

impl FingerprintCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, digest: &Digest) -> PathBuf {
        self.root.join(format!("{}.{}", digest, CACHE_EXTENSION))
    }

    pub fn lookup(&self, digest: &Digest) -> Result<CacheEntry, BlasterError> {
        let path = self.path_for(digest);
        match fs::metadata(&path) {
            Ok(meta) if meta.len() == 0 => Ok(CacheEntry::Empty),
            Ok(_) => Ok(CacheEntry::Populated(fs::read(&path)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CacheEntry::Absent),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the response for `digest`, replacing any previous entry.
    ///
    /// Content goes to a uniquely named temporary file first and is renamed
    /// into place, so a reader never observes a half-written entry.
    pub fn store(&self, digest: &Digest, bytes: &[u8]) -> Result<PathBuf, BlasterError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(digest);
        let temp = self.root.join(format!(
            "{}.{}.{}.tmp",
            digest,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let mut file = fs::File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &path)?;

        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Create an empty placeholder unless an entry already exists
    pub fn mark_empty(&self, digest: &Digest) -> Result<(), BlasterError> {
        fs::create_dir_all(&self.root)?;
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(digest))
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every zero-length entry so those queries can be searched again.
    /// Returns the number of entries removed.
    pub fn purge_empty(&self) -> Result<usize, BlasterError> {
        info!("Removing empty cache files");
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }
            if entry.metadata()?.len() != 0 {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("Removed empty cache file: {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!(
                    "Couldn't remove empty cache file {}: {}; remove it manually if this persists",
                    path.display(),
                    e
                ),
            }
        }
        Ok(removed)
    }
}

/// `<32 hex chars>.xml`
fn is_cache_file(path: &Path) -> bool {
    let ext_ok = path.extension().and_then(|e| e.to_str()) == Some(CACHE_EXTENSION);
    let stem_ok = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.parse::<Digest>().is_ok())
        .unwrap_or(false);
    ext_ok && stem_ok
}
