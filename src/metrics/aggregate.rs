//! Post-barrier reduction of drained job outcomes into a run summary.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::warn;

use crate::error::RunError;

use super::types::{FailureKind, JobOutcome, PhaseAverages, RunSummary, TimingRecord};

#[derive(Debug, Default, Clone, Copy)]
struct PhaseSums {
    dns_lookup: Duration,
    tcp_connect: Duration,
    tls_handshake: Duration,
    server_processing: Duration,
    content_transfer: Duration,
    count: u64,
}

impl PhaseSums {
    const fn add(&mut self, record: &TimingRecord) {
        self.dns_lookup = self.dns_lookup.saturating_add(record.dns_lookup);
        self.tcp_connect = self.tcp_connect.saturating_add(record.tcp_connect);
        self.tls_handshake = self.tls_handshake.saturating_add(record.tls_handshake);
        self.server_processing = self.server_processing.saturating_add(record.server_processing);
        self.content_transfer = self.content_transfer.saturating_add(record.content_transfer);
        self.count = self.count.saturating_add(1);
    }

    /// Sums stay at native precision; each phase is divided exactly once.
    fn averages(&self) -> Option<PhaseAverages> {
        if self.count == 0 {
            return None;
        }
        Some(PhaseAverages {
            dns_lookup: mean(self.dns_lookup, self.count),
            tcp_connect: mean(self.tcp_connect, self.count),
            tls_handshake: mean(self.tls_handshake, self.count),
            server_processing: mean(self.server_processing, self.count),
            content_transfer: mean(self.content_transfer, self.count),
        })
    }
}

fn mean(total: Duration, count: u64) -> Duration {
    let nanos = total.as_nanos().checked_div(u128::from(count)).unwrap_or(0);
    u64::try_from(nanos).map_or(Duration::MAX, Duration::from_nanos)
}

/// Drains one outcome per job the workers reported executing and reduces them
/// into a [`RunSummary`].
///
/// Precondition: every producer has already reported through the completion
/// barrier, so each expected outcome must be immediately available. The reads
/// are therefore non-blocking, and an empty sink before the expected count is
/// reached is a lost-record condition reported as
/// [`RunError::ResultShortfall`], never a "still arriving" state.
///
/// Outcomes are matched against `executed_per_worker`: an outcome from a
/// worker beyond its reported count (a task that died after pushing, so its
/// dropped barrier handle reported zero) is discarded instead of displacing a
/// live worker's record in the drain.
pub(crate) fn summarize(
    results_rx: &mut mpsc::Receiver<JobOutcome>,
    executed_per_worker: &BTreeMap<usize, u64>,
    scheduled_jobs: u64,
    duration: Duration,
) -> Result<RunSummary, RunError> {
    let expected_outcomes = executed_per_worker
        .values()
        .fold(0_u64, |acc, count| acc.saturating_add(*count));
    let mut remaining = executed_per_worker.clone();
    let mut sums = PhaseSums::default();
    let mut failed_jobs: u64 = 0;
    let mut timed_out_jobs: u64 = 0;
    let mut drained: u64 = 0;

    while drained < expected_outcomes {
        let outcome = match results_rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                return Err(RunError::ResultShortfall {
                    expected: expected_outcomes,
                    drained,
                });
            }
        };
        let Some(quota) = remaining
            .get_mut(&outcome.worker_id())
            .filter(|quota| **quota > 0)
        else {
            warn!(
                "Discarding outcome from worker {} beyond its reported count",
                outcome.worker_id()
            );
            continue;
        };
        *quota = quota.saturating_sub(1);

        match outcome {
            JobOutcome::Completed { record, .. } => sums.add(&record),
            JobOutcome::Failed(failure) => {
                failed_jobs = failed_jobs.saturating_add(1);
                if failure.kind == FailureKind::Timeout {
                    timed_out_jobs = timed_out_jobs.saturating_add(1);
                }
            }
        }
        drained = drained.saturating_add(1);
    }

    Ok(RunSummary {
        duration,
        scheduled_jobs,
        completed_jobs: sums.count,
        failed_jobs,
        timed_out_jobs,
        cancelled_jobs: scheduled_jobs.saturating_sub(expected_outcomes),
        averages: sums.averages(),
    })
}
