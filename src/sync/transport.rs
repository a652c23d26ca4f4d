use crate::utils::progress::DownloadProgress;
use crate::utils::retry::{with_retry, RetryPolicy};
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Moves remote documents and archives onto local disk
pub trait Transport: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String>;

    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// HTTP(S) transport with bounded retries
pub struct HttpTransport {
    client: Client,
    policy: RetryPolicy,
    show_progress: bool,
}

impl HttpTransport {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("blaster/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(std::time::Duration::from_secs(30))
            // Archives can take a long time; only the connect phase is bounded
            .timeout(None::<std::time::Duration>)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            policy,
            show_progress: true,
        })
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn check_scheme(url: &str) -> Result<()> {
        if url.starts_with("ftp://") {
            bail!(
                "Cannot fetch '{}': ftp:// is not supported, set sync.use_ftp = false to use https",
                url
            );
        }
        Ok(())
    }

    fn download_once(&self, url: &str, dest: &Path, progress: &DownloadProgress) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to start download of {}", url))?
            .error_for_status()?;

        progress.reset();
        progress.set_total(response.content_length().unwrap_or(0));

        let mut file = File::create(dest)
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        let mut buffer = vec![0u8; 64 * 1024];
        let mut downloaded = 0u64;
        loop {
            let n = response.read(&mut buffer).context("Failed to read chunk")?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n]).context("Failed to write chunk")?;
            downloaded += n as u64;
            progress.set_current(downloaded);
        }
        file.flush()?;
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn fetch_text(&self, url: &str) -> Result<String> {
        Self::check_scheme(url)?;
        with_retry(
            || {
                Ok(self
                    .client
                    .get(url)
                    .send()?
                    .error_for_status()?
                    .text()?)
            },
            &self.policy,
            url,
        )
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        Self::check_scheme(url)?;
        let progress = if self.show_progress {
            DownloadProgress::new(url.rsplit('/').next().unwrap_or(url))
        } else {
            DownloadProgress::hidden()
        };
        with_retry(|| self.download_once(url, dest, &progress), &self.policy, url)?;
        progress.finish();
        Ok(())
    }
}
