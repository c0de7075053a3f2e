mod aggregate;
mod types;


pub(crate) use aggregate::summarize;
pub use types::{FailureKind, JobFailure, JobOutcome, PhaseAverages, RunSummary, TimingRecord};
