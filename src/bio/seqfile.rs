//! FASTA / FASTQ input files, auto-detected by their first character

use crate::bio::sequence::{Query, ALLOWED_BASES};
use crate::BlasterError;
use nom::{
    bytes::complete::take_till,
    character::complete::{char, line_ending, not_line_ending},
    combinator::opt,
    IResult,
};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fasta,
    Fastq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub metadata: String,
    pub sequence: String,
    /// FASTQ `+` line
    pub separator: Option<String>,
    /// FASTQ quality line
    pub quality: Option<String>,
}

impl SequenceRecord {
    pub fn to_query(&self) -> Query {
        Query::new(&self.sequence)
    }
}

pub fn detect_format(data: &str) -> SequenceFormat {
    if data.trim_start().starts_with('>') {
        SequenceFormat::Fasta
    } else {
        SequenceFormat::Fastq
    }
}

/// `>` metadata line followed by everything up to the next record marker
fn fasta_record(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = char('>')(input)?;
    let (input, metadata) = not_line_ending(input)?;
    let (input, _) = opt(line_ending)(input)?;
    let (input, body) = take_till(|c| c == '>')(input)?;
    Ok((input, (metadata, body)))
}

fn parse_fasta(data: &str) -> Result<Vec<SequenceRecord>, BlasterError> {
    let mut records = Vec::new();
    let mut remaining = data;

    while !remaining.is_empty() {
        let (rest, (metadata, body)) = fasta_record(remaining).map_err(|e| {
            BlasterError::Format(format!("Failed to parse FASTA record: {:?}", e))
        })?;
        let sequence: String = body.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        records.push(SequenceRecord {
            metadata: metadata.trim_end().to_string(),
            sequence,
            separator: None,
            quality: None,
        });
        remaining = rest;
    }

    Ok(records)
}

fn parse_fastq(data: &str) -> Result<Vec<SequenceRecord>, BlasterError> {
    let lines: Vec<&str> = data.lines().collect();
    if lines.len() % 4 != 0 {
        return Err(BlasterError::Format(format!(
            "FASTQ line count must be divisible by 4, line count {}",
            lines.len()
        )));
    }

    lines
        .chunks(4)
        .map(|record| {
            let sequence = record[1];
            let disallowed: BTreeSet<char> = sequence
                .bytes()
                .filter(|b| !ALLOWED_BASES.contains(b))
                .map(char::from)
                .collect();
            if !disallowed.is_empty() {
                return Err(BlasterError::Validation(format!(
                    "Sequence '{}' contains {:?}, which is not a subset of {{A, T, C, G, U}}",
                    sequence, disallowed
                )));
            }
            Ok(SequenceRecord {
                metadata: record[0].to_string(),
                sequence: sequence.to_string(),
                separator: Some(record[2].to_string()),
                quality: Some(record[3].to_string()),
            })
        })
        .collect()
}

/// Parse sequence records from text, detecting the format first
pub fn parse_sequences(data: &str) -> Result<Vec<SequenceRecord>, BlasterError> {
    let data = data.trim();
    match detect_format(data) {
        SequenceFormat::Fasta => {
            debug!("Reading FASTA input");
            parse_fasta(data)
        }
        SequenceFormat::Fastq => {
            debug!("Reading FASTQ input");
            parse_fastq(data)
        }
    }
}

pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<SequenceRecord>, BlasterError> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)?;
    let records = parse_sequences(&data).map_err(|e| match e {
        BlasterError::Format(msg) => {
            BlasterError::Format(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    info!("Parsed {} sequences from {}", records.len(), path.display());
    Ok(records)
}

/// Read every record of a sequence file as a query
pub fn read_queries<P: AsRef<Path>>(path: P) -> Result<Vec<Query>, BlasterError> {
    Ok(read_records(path)?.iter().map(SequenceRecord::to_query).collect())
}
