//! BLAST XML (`BlastOutput`) report parsing.
//!
//! Only the fields needed for coverage, identity and labelling are read; the
//! rest of the document is skipped. Every `Iteration` becomes one
//! [`AlignmentReport`].

use crate::bio::alignment::{Alignment, AlignmentReport, Hsp, Measure};
use crate::BlasterError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename = "BlastOutput")]
struct BlastOutputXml {
    #[serde(rename = "BlastOutput_query-len")]
    query_len: Option<String>,
    #[serde(rename = "BlastOutput_iterations")]
    iterations: Option<IterationsXml>,
}

#[derive(Debug, Deserialize)]
struct IterationsXml {
    #[serde(rename = "Iteration", default)]
    iterations: Vec<IterationXml>,
}

#[derive(Debug, Deserialize)]
struct IterationXml {
    #[serde(rename = "Iteration_query-len")]
    query_len: Option<String>,
    #[serde(rename = "Iteration_hits")]
    hits: Option<HitsXml>,
}

#[derive(Debug, Deserialize)]
struct HitsXml {
    #[serde(rename = "Hit", default)]
    hits: Vec<HitXml>,
}

#[derive(Debug, Deserialize)]
struct HitXml {
    #[serde(rename = "Hit_id")]
    id: Option<String>,
    #[serde(rename = "Hit_def")]
    def: Option<String>,
    #[serde(rename = "Hit_len")]
    len: Option<String>,
    #[serde(rename = "Hit_hsps")]
    hsps: Option<HspsXml>,
}

#[derive(Debug, Deserialize)]
struct HspsXml {
    #[serde(rename = "Hsp", default)]
    hsps: Vec<HspXml>,
}

#[derive(Debug, Deserialize)]
struct HspXml {
    #[serde(rename = "Hsp_query-from")]
    query_from: Option<String>,
    #[serde(rename = "Hsp_query-to")]
    query_to: Option<String>,
    #[serde(rename = "Hsp_identity")]
    identity: Option<String>,
    #[serde(rename = "Hsp_align-len")]
    align_len: Option<String>,
}

fn measure(value: &Option<String>) -> Measure<u64> {
    value
        .as_deref()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .into()
}

impl From<HspXml> for Hsp {
    fn from(hsp: HspXml) -> Self {
        Hsp {
            query_start: measure(&hsp.query_from),
            query_end: measure(&hsp.query_to),
            identities: measure(&hsp.identity),
            align_length: measure(&hsp.align_len),
        }
    }
}

impl From<HitXml> for Alignment {
    fn from(hit: HitXml) -> Self {
        Alignment {
            length: measure(&hit.len),
            hit_id: hit.id.unwrap_or_default(),
            title: hit.def.unwrap_or_default(),
            hsps: hit
                .hsps
                .map(|h| h.hsps.into_iter().map(Hsp::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// Parse every report in a BLAST XML document
pub fn parse_reports(xml: &str) -> Result<Vec<AlignmentReport>, BlasterError> {
    let output: BlastOutputXml = quick_xml::de::from_str(xml)
        .map_err(|e| BlasterError::Parse(format!("Malformed BLAST XML: {}", e)))?;

    let document_query_len = measure(&output.query_len);
    let iterations = output.iterations.map(|i| i.iterations).unwrap_or_default();

    Ok(iterations
        .into_iter()
        .map(|iteration| {
            let query_length = match measure(&iteration.query_len) {
                Measure::Unknown => document_query_len,
                known => known,
            };
            AlignmentReport {
                query_length,
                alignments: iteration
                    .hits
                    .map(|h| h.hits.into_iter().map(Alignment::from).collect())
                    .unwrap_or_default(),
            }
        })
        .collect())
}

enum StreamState {
    Pending(Vec<u8>),
    Reading(std::vec::IntoIter<AlignmentReport>),
    Done,
}

/// Forward-only, single-pass sequence of reports read from one cache entry.
///
/// Parsing is deferred to the first `next()`. An empty entry yields one
/// `NoResult` error; a malformed one yields one `Parse` error. After an error
/// or the last report the stream stays exhausted.
pub struct ReportStream {
    label: String,
    state: StreamState,
}

impl ReportStream {
    pub fn from_bytes(label: impl Into<String>, raw: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            state: StreamState::Pending(raw),
        }
    }

    /// Stream for a query whose cache entry is a placeholder
    pub fn no_result(label: impl Into<String>) -> Self {
        Self::from_bytes(label, Vec::new())
    }

    /// Consume the stream and return its first report
    pub fn first_report(mut self) -> Result<AlignmentReport, BlasterError> {
        let label = self.label.clone();
        self.next().unwrap_or(Err(BlasterError::NoResult(label)))
    }
}

impl Iterator for ReportStream {
    type Item = Result<AlignmentReport, BlasterError>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, StreamState::Done) {
            StreamState::Pending(raw) => {
                if raw.is_empty() {
                    return Some(Err(BlasterError::NoResult(self.label.clone())));
                }
                match parse_reports(&String::from_utf8_lossy(&raw)) {
                    Ok(reports) => {
                        self.state = StreamState::Reading(reports.into_iter());
                        self.next()
                    }
                    Err(e) => Some(Err(e)),
                }
            }
            StreamState::Reading(mut reports) => {
                let report = reports.next()?;
                self.state = StreamState::Reading(reports);
                Some(Ok(report))
            }
            StreamState::Done => None,
        }
    }
}
