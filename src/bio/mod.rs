pub mod alignment;
pub mod blast_xml;
pub mod seqfile;
pub mod sequence;

pub use alignment::{Alignment, AlignmentReport, Hsp, Measure};
pub use sequence::{Digest, Query};
