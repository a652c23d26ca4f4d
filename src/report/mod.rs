pub mod formatter;
pub mod output;

pub use formatter::{format_report, merge_intervals, FormattedRow};
pub use output::{write_batch, RunOutput, RunSummary};
