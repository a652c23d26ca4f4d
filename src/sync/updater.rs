use crate::sync::metadata::{metadata_names_from_listing, metadata_url, parse_metadata, RemoteDatabase};
use crate::sync::registry::RemoteRegistry;
use crate::sync::transport::Transport;
use crate::BlasterError;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::info;

/// Marker file that identifies an installed database directory
pub const LOCAL_DB_MARKER: &str = "taxonomy4blast.sqlite3";

const CHECKSUM_CHUNK: usize = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct DatabaseSync<T: Transport> {
    transport: T,
    base_url: String,
    databases_dir: PathBuf,
    use_ftp: bool,
}

/// Lowercase hex MD5 of a file, read in 1 MiB chunks
pub fn file_md5(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; CHECKSUM_CHUNK];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        context.consume(&buffer[..n]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// Unpack a tar archive, gzip-compressed or not, into `dest`
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let mut file = File::open(archive)
        .with_context(|| format!("Failed to open archive {}", archive.display()))?;
    let mut magic = [0u8; 2];
    let gzipped = file.read(&mut magic)? == 2 && magic == [0x1f, 0x8b];
    file.seek(SeekFrom::Start(0))?;

    let reader = BufReader::new(file);
    let result = if gzipped {
        tar::Archive::new(GzDecoder::new(reader)).unpack(dest)
    } else {
        tar::Archive::new(reader).unpack(dest)
    };
    result.map_err(|e| {
        BlasterError::Database(format!("Failed to extract {}: {}", archive.display(), e)).into()
    })
}

fn file_name_of(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

impl<T: Transport> DatabaseSync<T> {
    pub fn new(transport: T, base_url: impl Into<String>, databases_dir: impl Into<PathBuf>, use_ftp: bool) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            databases_dir: databases_dir.into(),
            use_ftp,
        }
    }

    pub fn databases_dir(&self) -> &Path {
        &self.databases_dir
    }

    pub fn resolve_url(&self, url: &str) -> String {
        if self.use_ftp {
            url.to_string()
        } else {
            url.replacen("ftp://", "https://", 1)
        }
    }

    /// Read the listing and every metadata document it links to.
    /// Any unsupported metadata version aborts the whole fetch.
    pub fn fetch_remote_databases(&self) -> Result<Vec<RemoteDatabase>> {
        info!("Fetching remote databases from {}", self.base_url);
        let listing = self.transport.fetch_text(&self.base_url)?;

        let mut databases = Vec::new();
        for name in metadata_names_from_listing(&listing) {
            let url = metadata_url(&self.base_url, &name);
            info!("Fetching '{}' from {}", name, url);
            let document = self.transport.fetch_text(&url)?;
            let database = parse_metadata(&document)
                .with_context(|| format!("Invalid metadata document {}", url))?;
            databases.push(database);
        }
        Ok(databases)
    }

    /// Replace the registry contents with a fresh fetch and save it
    pub fn refresh_registry(&self, registry: &mut RemoteRegistry) -> Result<usize> {
        let databases = self.fetch_remote_databases()?;
        let count = databases.len();
        registry.replace_all(databases);
        registry.save()?;
        Ok(count)
    }

    /// Installed databases, sorted by name
    pub fn local_databases(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.databases_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() && path.join(LOCAL_DB_MARKER).is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Bring every archive of `database` up to date.
    ///
    /// Archives whose remote checksum matches the stored `.md5` are skipped.
    /// A downloaded archive must match its checksum before it is extracted;
    /// the checksum is recorded only once extraction succeeded.
    pub fn update_database(&self, database: &RemoteDatabase) -> Result<UpdateSummary> {
        info!("Installing {}", database.name);
        let db_dir = self.databases_dir.join(&database.name);
        fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;

        let mut summary = UpdateSummary::default();
        for file_url in &database.files {
            let file_url = self.resolve_url(file_url);
            let file_name = file_name_of(&file_url).to_string();
            let archive_path = db_dir.join(&file_name);
            let md5_path = db_dir.join(format!("{}.md5", file_name));
            let md5_download = db_dir.join(format!("{}.md5.download", file_name));

            info!("Downloading hash of '{}'", file_name);
            self.transport
                .download(&format!("{}.md5", file_url), &md5_download)?;
            let remote_md5 = fs::read_to_string(&md5_download)?.trim().to_string();

            let up_to_date = fs::read_to_string(&md5_path)
                .map(|local| local.trim() == remote_md5)
                .unwrap_or(false);
            if up_to_date {
                info!("Hashes match, '{}' is already up-to-date", file_name);
                fs::remove_file(&md5_download)?;
                summary.skipped.push(file_name);
                continue;
            }

            info!("Downloading '{}'", file_name);
            self.transport.download(&file_url, &archive_path)?;

            info!("Comparing hash of '{}'", file_name);
            let computed = file_md5(&archive_path)?;
            if !remote_md5.starts_with(&computed) {
                return Err(BlasterError::Checksum {
                    file: file_name,
                    expected: remote_md5
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .to_string(),
                    computed,
                }
                .into());
            }

            info!("Extracting '{}'", file_name);
            extract_archive(&archive_path, &db_dir)?;

            info!("Removing '{}'", file_name);
            fs::remove_file(&archive_path)?;
            fs::rename(&md5_download, &md5_path)?;
            summary.updated.push(file_name);
        }
        Ok(summary)
    }
}
