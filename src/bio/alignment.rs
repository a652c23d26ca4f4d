//! Parsed alignment report data model

use serde::{Deserialize, Serialize};

/// A measurement the service may leave out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measure<T> {
    Known(T),
    Unknown,
}

impl<T> Measure<T> {
    pub fn known(self) -> Option<T> {
        match self {
            Measure::Known(value) => Some(value),
            Measure::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Measure::Known(_))
    }
}

impl<T> From<Option<T>> for Measure<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Measure::Known(v),
            None => Measure::Unknown,
        }
    }
}

impl<T> Default for Measure<T> {
    fn default() -> Self {
        Measure::Unknown
    }
}

/// One locally aligned segment. Query offsets are 1-based and inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsp {
    pub query_start: Measure<u64>,
    pub query_end: Measure<u64>,
    pub identities: Measure<u64>,
    pub align_length: Measure<u64>,
}

impl Hsp {
    pub fn new(start: u64, end: u64, identities: u64, align_length: u64) -> Self {
        Self {
            query_start: Measure::Known(start),
            query_end: Measure::Known(end),
            identities: Measure::Known(identities),
            align_length: Measure::Known(align_length),
        }
    }

    /// Query interval when both ends are known
    pub fn query_interval(&self) -> Option<(u64, u64)> {
        Some((self.query_start.known()?, self.query_end.known()?))
    }
}

/// One candidate matching reference sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    /// Pipe-delimited identifier, e.g. `gi|1234|gb|MN908947.3|`
    pub hit_id: String,
    pub title: String,
    pub length: Measure<u64>,
    pub hsps: Vec<Hsp>,
}

/// All alignments reported for one query, most significant first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub query_length: Measure<u64>,
    pub alignments: Vec<Alignment>,
}
