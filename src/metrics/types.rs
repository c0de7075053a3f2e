//! Per-job timing records and the reduced run summary.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Five-phase latency breakdown for one completed request, captured by the
/// timed transport. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingRecord {
    pub dns_lookup: Duration,
    pub tcp_connect: Duration,
    pub tls_handshake: Duration,
    pub server_processing: Duration,
    pub content_transfer: Duration,
    pub completed_at: DateTime<Utc>,
}

/// Failure classification carried into the summary without the source error,
/// which is logged at the point of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Dns,
    Connect,
    Tls,
    RequestWrite,
    ResponseRead,
    InvalidResponse,
    Timeout,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::RequestWrite => "request-write",
            Self::ResponseRead => "response-read",
            Self::InvalidResponse => "invalid-response",
            Self::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub worker_id: usize,
    pub job: u64,
    pub kind: FailureKind,
}

/// One entry pushed to the result sink per executed job. Both variants carry
/// the producing worker's id so the drain can match outcomes against the
/// per-worker counts the completion barrier collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed {
        worker_id: usize,
        record: TimingRecord,
    },
    Failed(JobFailure),
}

impl JobOutcome {
    #[must_use]
    pub(crate) const fn worker_id(&self) -> usize {
        match self {
            Self::Completed { worker_id, .. } => *worker_id,
            Self::Failed(failure) => failure.worker_id,
        }
    }
}

/// Arithmetic mean of each phase across all completed jobs of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseAverages {
    pub dns_lookup: Duration,
    pub tcp_connect: Duration,
    pub tls_handshake: Duration,
    pub server_processing: Duration,
    pub content_transfer: Duration,
}

/// Final result of a run. `averages` is `None` when no job completed, so the
/// no-data case stays distinct from an all-zero breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub duration: Duration,
    pub scheduled_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub timed_out_jobs: u64,
    pub cancelled_jobs: u64,
    pub averages: Option<PhaseAverages>,
}
