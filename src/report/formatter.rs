//! Ranked, truncated rows derived from one alignment report

use crate::bio::alignment::{Alignment, AlignmentReport, Hsp, Measure};
use std::fmt;

pub const UNKNOWN_COVERAGE: &str = "?";
pub const UNKNOWN_IDENTITY: &str = "?%";
pub const UNKNOWN_LENGTH: &str = "?";

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedRow {
    pub accession: String,
    /// Percent of the query covered by the alignment's merged HSP intervals
    pub coverage: Measure<f64>,
    /// Percent identity of the emitted HSP
    pub identity: Measure<f64>,
    pub matched_length: Measure<u64>,
    pub title: String,
}

/// Two decimals with a percent sign, right-justified to width 7
fn percent(value: f64) -> String {
    format!("{:>7}", format!("{:.2}%", value))
}

impl FormattedRow {
    pub fn coverage_text(&self) -> String {
        match self.coverage {
            Measure::Known(value) => percent(value),
            Measure::Unknown => UNKNOWN_COVERAGE.to_string(),
        }
    }

    pub fn identity_text(&self) -> String {
        match self.identity {
            Measure::Known(value) => percent(value),
            Measure::Unknown => UNKNOWN_IDENTITY.to_string(),
        }
    }

    pub fn length_text(&self) -> String {
        match self.matched_length {
            Measure::Known(value) => value.to_string(),
            Measure::Unknown => UNKNOWN_LENGTH.to_string(),
        }
    }
}

impl fmt::Display for FormattedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.accession,
            self.coverage_text(),
            self.identity_text(),
            self.length_text(),
            self.title
        )
    }
}

/// Accession from a `db|accession|version|...` style identifier: the
/// second-to-last `|` segment, trimmed. Identifiers without a `|` are used
/// whole.
pub fn accession_from_hit_id(hit_id: &str) -> String {
    let segments: Vec<&str> = hit_id.split('|').collect();
    if segments.len() < 2 {
        return hit_id.trim().to_string();
    }
    segments[segments.len() - 2].trim().to_string()
}

/// Union of closed intervals. Sorted by start, then merged in one sweep:
/// an interval whose start lies within the running span extends it.
pub fn merge_intervals(mut intervals: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    for interval in intervals.iter_mut() {
        if interval.0 > interval.1 {
            *interval = (interval.1, interval.0);
        }
    }
    intervals.sort_by_key(|&(start, _)| start);

    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(running) if running.0 <= start && start <= running.1 => {
                running.1 = running.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Positions spanned by the merged intervals
pub fn covered_length(intervals: &[(u64, u64)]) -> u64 {
    intervals.iter().map(|(start, end)| end - start + 1).sum()
}

pub fn query_coverage(alignment: &Alignment, query_length: Measure<u64>) -> Measure<f64> {
    let total = match query_length {
        Measure::Known(total) if total > 0 => total,
        _ => return Measure::Unknown,
    };
    let intervals: Vec<(u64, u64)> = alignment
        .hsps
        .iter()
        .filter_map(Hsp::query_interval)
        .collect();
    let covered = covered_length(&merge_intervals(intervals));
    if covered == 0 {
        return Measure::Unknown;
    }
    Measure::Known(covered as f64 / total as f64 * 100.0)
}

pub fn hsp_identity(hsp: &Hsp) -> Measure<f64> {
    match (hsp.identities, hsp.align_length) {
        (Measure::Known(identities), Measure::Known(length)) if length > 0 => {
            Measure::Known(identities as f64 / length as f64 * 100.0)
        }
        _ => Measure::Unknown,
    }
}

/// Rows for the first `max_alignments` alignments, up to `max_hsps` rows each.
/// Alignments keep the order the service ranked them in.
pub fn format_report(
    report: &AlignmentReport,
    max_alignments: usize,
    max_hsps: usize,
) -> impl Iterator<Item = FormattedRow> + '_ {
    let query_length = report.query_length;
    report
        .alignments
        .iter()
        .take(max_alignments)
        .flat_map(move |alignment| {
            let accession = accession_from_hit_id(&alignment.hit_id);
            let coverage = query_coverage(alignment, query_length);
            let title = alignment.title.trim().to_string();
            alignment
                .hsps
                .iter()
                .take(max_hsps)
                .map(move |hsp| FormattedRow {
                    accession: accession.clone(),
                    coverage,
                    identity: hsp_identity(hsp),
                    matched_length: alignment.length,
                    title: title.clone(),
                })
        })
}
