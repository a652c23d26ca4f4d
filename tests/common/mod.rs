//! Shared fixtures for the integration tests: BLAST XML documents and
//! in-process stand-ins for the search service and download transport.
#![allow(dead_code)]

use blaster::bio::sequence::Query;
use blaster::search::client::RemoteSearch;
use blaster::sync::Transport;
use blaster::BlasterError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One HSP as (query_from, query_to, identities, align_len)
pub type HspSpec = (u64, u64, u64, u64);

pub struct HitSpec {
    pub id: String,
    pub title: String,
    pub length: u64,
    pub hsps: Vec<HspSpec>,
}

impl HitSpec {
    pub fn new(id: &str, title: &str, length: u64, hsps: Vec<HspSpec>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            length,
            hsps,
        }
    }
}

/// Single-iteration BLAST XML document
pub fn blast_xml(query_len: u64, hits: &[HitSpec]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<BlastOutput>\n");
    xml.push_str("  <BlastOutput_program>blastn</BlastOutput_program>\n");
    xml.push_str(&format!(
        "  <BlastOutput_query-len>{}</BlastOutput_query-len>\n",
        query_len
    ));
    xml.push_str("  <BlastOutput_iterations>\n    <Iteration>\n");
    xml.push_str("      <Iteration_iter-num>1</Iteration_iter-num>\n");
    xml.push_str("      <Iteration_hits>\n");
    for (n, hit) in hits.iter().enumerate() {
        xml.push_str("        <Hit>\n");
        xml.push_str(&format!("          <Hit_num>{}</Hit_num>\n", n + 1));
        xml.push_str(&format!("          <Hit_id>{}</Hit_id>\n", hit.id));
        xml.push_str(&format!("          <Hit_def>{}</Hit_def>\n", hit.title));
        xml.push_str(&format!("          <Hit_len>{}</Hit_len>\n", hit.length));
        xml.push_str("          <Hit_hsps>\n");
        for (from, to, identity, align_len) in &hit.hsps {
            xml.push_str("            <Hsp>\n");
            xml.push_str(&format!("              <Hsp_query-from>{}</Hsp_query-from>\n", from));
            xml.push_str(&format!("              <Hsp_query-to>{}</Hsp_query-to>\n", to));
            xml.push_str(&format!("              <Hsp_identity>{}</Hsp_identity>\n", identity));
            xml.push_str(&format!("              <Hsp_align-len>{}</Hsp_align-len>\n", align_len));
            xml.push_str("            </Hsp>\n");
        }
        xml.push_str("          </Hit_hsps>\n        </Hit>\n");
    }
    xml.push_str("      </Iteration_hits>\n    </Iteration>\n  </BlastOutput_iterations>\n</BlastOutput>\n");
    xml
}

/// Perfect single-HSP match over the whole query
pub fn perfect_match_xml(query: &Query) -> String {
    let len = query.len() as u64;
    blast_xml(
        len,
        &[HitSpec::new(
            "gi|42|gb|MATCH0001.1|",
            "Synthetic construct",
            len,
            vec![(1, len, len, len)],
        )],
    )
}

/// Search service stand-in that records calls and peak concurrency
pub struct FakeSearch {
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    delay: Duration,
    /// Queries (by sequence) that fail with a network error
    failing: Vec<String>,
    /// Queries (by sequence) answered with an empty body
    empty: Vec<String>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::from_millis(30),
            failing: Vec::new(),
            empty: Vec::new(),
        }
    }

    pub fn failing_on(mut self, sequence: &str) -> Self {
        self.failing.push(sequence.to_string());
        self
    }

    pub fn empty_on(mut self, sequence: &str) -> Self {
        self.empty.push(sequence.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl RemoteSearch for FakeSearch {
    fn submit(&self, query: &Query, _database: &str) -> Result<Vec<u8>, BlasterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|s| s == query.as_str()) {
            return Err(BlasterError::Network("service unavailable".to_string()));
        }
        if self.empty.iter().any(|s| s == query.as_str()) {
            return Ok(Vec::new());
        }
        Ok(perfect_match_xml(query).into_bytes())
    }
}

/// Download transport serving canned documents and archives from memory
#[derive(Default)]
pub struct FakeTransport {
    texts: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, url: &str, text: &str) -> Self {
        self.texts.insert(url.to_string(), text.to_string());
        self
    }

    pub fn with_file(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }

    pub fn requested(&self, url: &str) -> bool {
        self.requests.lock().unwrap().iter().any(|u| u == url)
    }
}

impl Transport for FakeTransport {
    fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.texts
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 for {}", url))
    }

    fn download(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        self.requests.lock().unwrap().push(url.to_string());
        let bytes = match self.files.get(url) {
            Some(bytes) => bytes.clone(),
            None => self
                .texts
                .get(url)
                .map(|t| t.clone().into_bytes())
                .ok_or_else(|| anyhow::anyhow!("404 for {}", url))?,
        };
        std::fs::write(dest, bytes)?;
        Ok(())
    }
}

/// gzip-compressed tar holding `entries` as (path, contents)
pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}
