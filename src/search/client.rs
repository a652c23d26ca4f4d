//! Client for the NCBI BLAST URL API (`Blast.cgi`).
//!
//! A search is submitted with `CMD=Put`, polled with
//! `CMD=Get&FORMAT_OBJECT=SearchInfo` until the service reports it ready, and
//! the XML report is fetched with `CMD=Get&FORMAT_TYPE=XML`. Failures are
//! returned to the caller; nothing here retries.

use crate::bio::sequence::Query;
use crate::core::config::SearchConfig;
use crate::BlasterError;
use parking_lot::Mutex;
use regex::Regex;
use reqwest::blocking::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One blocking search against a remote alignment service
pub trait RemoteSearch: Send + Sync {
    /// Returns the raw report body, which may be empty or malformed
    fn submit(&self, query: &Query, database: &str) -> Result<Vec<u8>, BlasterError>;
}

#[derive(Debug, Clone)]
pub struct QBlastOptions {
    pub service_url: String,
    pub program: String,
    pub megablast: bool,
    pub email: Option<String>,
    pub tool: String,
    pub poll_interval: Duration,
    /// Minimum spacing between any two requests from this client
    pub min_request_interval: Duration,
}

impl From<&SearchConfig> for QBlastOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            service_url: config.service_url.clone(),
            program: config.program.clone(),
            megablast: config.megablast,
            email: config.email.clone(),
            tool: config.tool.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            min_request_interval: Duration::from_secs(config.min_request_interval_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Waiting,
    Ready,
    Failed,
    Unknown,
}

/// Extract `RID` and `RTOE` (estimated seconds to completion) from a Put response
pub fn parse_put_response(text: &str) -> Result<(String, u64), BlasterError> {
    let rid = Regex::new(r"RID = (\S+)")
        .ok()
        .and_then(|re| re.captures(text))
        .map(|c| c[1].to_string())
        .ok_or_else(|| {
            BlasterError::Network(format!(
                "No RID in search submission response: {}",
                text.chars().take(200).collect::<String>()
            ))
        })?;
    let rtoe = Regex::new(r"RTOE = (\d+)")
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    Ok((rid, rtoe))
}

pub fn parse_search_status(text: &str) -> SearchStatus {
    if text.contains("Status=WAITING") {
        SearchStatus::Waiting
    } else if text.contains("Status=FAILED") {
        SearchStatus::Failed
    } else if text.contains("Status=READY") {
        SearchStatus::Ready
    } else {
        SearchStatus::Unknown
    }
}

pub struct QBlastClient {
    http: Client,
    options: QBlastOptions,
    last_request: Mutex<Option<Instant>>,
}

impl QBlastClient {
    pub fn new(options: QBlastOptions) -> Result<Self, BlasterError> {
        let http = Client::builder()
            .user_agent(concat!("blaster/", env!("CARGO_PKG_VERSION")))
            // The service's own transport decides how long a request may take
            .timeout(None::<Duration>)
            .build()?;
        Ok(Self {
            http,
            options,
            last_request: Mutex::new(None),
        })
    }

    /// Wait until the minimum request spacing has passed.
    /// The lock is held while sleeping so concurrent workers queue up.
    fn throttle(&self) {
        let mut last = self.last_request.lock();
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.options.min_request_interval {
                std::thread::sleep(self.options.min_request_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn identity_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", self.options.tool.clone())];
        if let Some(email) = &self.options.email {
            params.push(("email", email.clone()));
        }
        params
    }

    fn put(&self, query: &Query, database: &str) -> Result<(String, u64), BlasterError> {
        let mut form = vec![
            ("CMD", "Put".to_string()),
            ("PROGRAM", self.options.program.clone()),
            ("DATABASE", database.to_string()),
            ("QUERY", query.as_str().to_string()),
        ];
        if self.options.megablast {
            form.push(("MEGABLAST", "on".to_string()));
        }
        form.extend(self.identity_params());

        self.throttle();
        let text = self
            .http
            .post(&self.options.service_url)
            .form(&form)
            .send()?
            .error_for_status()?
            .text()?;
        parse_put_response(&text)
    }

    fn get(&self, rid: &str, extra: &[(&'static str, &str)]) -> Result<Vec<u8>, BlasterError> {
        let mut params: Vec<(&str, String)> =
            vec![("CMD", "Get".to_string()), ("RID", rid.to_string())];
        params.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        params.extend(self.identity_params());

        self.throttle();
        let bytes = self
            .http
            .get(&self.options.service_url)
            .query(&params)
            .send()?
            .error_for_status()?
            .bytes()?;
        Ok(bytes.to_vec())
    }
}

impl RemoteSearch for QBlastClient {
    fn submit(&self, query: &Query, database: &str) -> Result<Vec<u8>, BlasterError> {
        let (rid, rtoe) = self.put(query, database)?;
        info!(
            "{} submitted as RID {} (estimated {}s)",
            query.prefix(10),
            rid,
            rtoe
        );
        std::thread::sleep(Duration::from_secs(rtoe));

        loop {
            let info = self.get(&rid, &[("FORMAT_OBJECT", "SearchInfo")])?;
            match parse_search_status(&String::from_utf8_lossy(&info)) {
                SearchStatus::Ready => break,
                SearchStatus::Waiting => {
                    debug!("RID {} still running", rid);
                    std::thread::sleep(self.options.poll_interval);
                }
                SearchStatus::Failed => {
                    return Err(BlasterError::Network(format!("Search {} failed", rid)));
                }
                SearchStatus::Unknown => {
                    return Err(BlasterError::Network(format!(
                        "Search {} is unknown to the service or has expired",
                        rid
                    )));
                }
            }
        }

        self.get(&rid, &[("FORMAT_TYPE", "XML")])
    }
}
