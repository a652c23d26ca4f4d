//! Per-run, append-only text output of formatted match rows

use crate::bio::sequence::Query;
use crate::report::formatter::{format_report, FormattedRow};
use crate::search::scheduler::BatchStream;
use crate::BlasterError;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PREFIX_LEN: usize = 10;
const SEPARATOR: &str = "  ";

pub struct RunOutput {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Output file name for a run started at `time`
pub fn output_file_name(time: chrono::DateTime<chrono::Local>) -> String {
    time.format("%Y_%m_%d_%H_%M_%S.txt").to_string()
}

impl RunOutput {
    /// Open (or continue) the timestamp-named output file inside `dir`
    pub fn create_in(dir: &Path) -> Result<Self, BlasterError> {
        std::fs::create_dir_all(dir)?;
        Self::open(dir.join(output_file_name(chrono::Local::now())))
    }

    pub fn open(path: PathBuf) -> Result<Self, BlasterError> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_row(&mut self, query: &Query, row: &FormattedRow) -> Result<(), BlasterError> {
        let fields = [
            query.prefix(PREFIX_LEN).to_string(),
            format!("{:>6}", query.len()),
            row.accession.clone(),
            row.coverage_text(),
            row.identity_text(),
            format!("{:>10}", row.length_text()),
            row.title.clone(),
        ];
        writeln!(self.writer, "{}", fields.join(SEPARATOR))?;
        Ok(())
    }

    pub fn write_no_result(&mut self, query: &Query) -> Result<(), BlasterError> {
        writeln!(
            self.writer,
            "{}{}{:>6}{}no result",
            query.prefix(PREFIX_LEN),
            SEPARATOR,
            query.len(),
            SEPARATOR
        )?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), BlasterError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub queries: usize,
    pub rows: usize,
    pub no_result: usize,
    pub failed: usize,
}

/// Drain a batch, formatting the first report of every query into `output`.
///
/// Queries without a result get a `no result` line. Failed searches and
/// unreadable reports are counted and logged but do not stop the run.
pub fn write_batch(
    stream: BatchStream,
    output: &mut RunOutput,
    max_alignments: usize,
    max_hsps: usize,
) -> Result<RunSummary, BlasterError> {
    let mut summary = RunSummary::default();

    for result in stream {
        summary.queries += 1;
        let report = match result.outcome.and_then(|reports| reports.first_report()) {
            Ok(report) => report,
            Err(BlasterError::NoResult(_)) => {
                summary.no_result += 1;
                output.write_no_result(&result.query)?;
                continue;
            }
            Err(e) => {
                summary.failed += 1;
                warn!("{} could not be reported: {}", result.query.prefix(PREFIX_LEN), e);
                continue;
            }
        };

        info!("== {} ==", result.query.prefix(PREFIX_LEN));
        for row in format_report(&report, max_alignments, max_hsps) {
            output.write_row(&result.query, &row)?;
            summary.rows += 1;
        }
    }

    output.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::alignment::Measure;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_output_file_name() {
        let time = chrono::Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(output_file_name(time), "2024_03_07_09_05_01.txt");
    }

    #[test]
    fn test_rows_are_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");
        let query = Query::new("ACGTACGTACGTACGT");
        let row = FormattedRow {
            accession: "AB000001.1".to_string(),
            coverage: Measure::Known(100.0),
            identity: Measure::Unknown,
            matched_length: Measure::Known(5000),
            title: "Example".to_string(),
        };

        let mut output = RunOutput::open(path.clone()).unwrap();
        output.write_row(&query, &row).unwrap();
        output.flush().unwrap();
        drop(output);

        let mut output = RunOutput::open(path.clone()).unwrap();
        output.write_no_result(&query).unwrap();
        output.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "ACGTACGTAC      16  AB000001.1  100.00%  ?%        5000  Example"
        );
        assert_eq!(lines[1], "ACGTACGTAC      16  no result");
    }
}
