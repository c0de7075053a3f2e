//! Pool orchestration: spawn workers, wait on the barrier, drain and reduce.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::{AppError, AppResult, ValidationError};
use crate::metrics::{JobOutcome, RunSummary, summarize};
use crate::shutdown::ShutdownSender;
use crate::transport::{Job, TimedTransport};

use super::barrier::CompletionBarrier;
use super::worker::{WorkerContext, run_worker};

/// Shape of one run: worker count, jobs per worker, and the pause between
/// consecutive jobs on the same worker.
#[derive(Debug, Clone, Copy)]
pub struct RunPlan {
    pub workers: usize,
    pub jobs_per_worker: u64,
    pub pacing: Duration,
}

impl RunPlan {
    fn total_jobs(self) -> Result<u64, ValidationError> {
        let workers = u64::try_from(self.workers).unwrap_or(u64::MAX);
        workers
            .checked_mul(self.jobs_per_worker)
            .ok_or(ValidationError::JobTotalOverflow {
                workers,
                jobs_per_worker: self.jobs_per_worker,
            })
    }
}

/// Runs the full plan against one job spec and reduces the drained outcomes
/// into a [`RunSummary`].
///
/// The result sink is sized to the whole schedule, so workers never block on
/// it. Outcomes are drained only after the completion barrier has collected
/// one report per worker; the expected count is the sum of jobs the workers
/// actually executed.
///
/// # Errors
///
/// Fails when the schedule overflows, or when the sink holds fewer outcomes
/// than the workers reported executing.
pub async fn execute(
    plan: RunPlan,
    job: &Arc<Job>,
    transport: &Arc<dyn TimedTransport>,
    shutdown_tx: &ShutdownSender,
) -> AppResult<RunSummary> {
    let scheduled = plan.total_jobs()?;
    let capacity = usize::try_from(scheduled)
        .ok()
        .ok_or_else(|| ValidationError::JobTotalOverflow {
            workers: u64::try_from(plan.workers).unwrap_or(u64::MAX),
            jobs_per_worker: plan.jobs_per_worker,
        })?;

    let (results_tx, mut results_rx) = mpsc::channel::<JobOutcome>(capacity.max(1));
    let barrier = CompletionBarrier::new(plan.workers);

    debug!(
        "Spawning {} workers with {} jobs each",
        plan.workers, plan.jobs_per_worker
    );
    let run_start = Instant::now();

    let mut handles = Vec::with_capacity(plan.workers);
    for worker_id in 1..=plan.workers {
        let context = WorkerContext {
            worker_id,
            jobs: plan.jobs_per_worker,
            pacing: plan.pacing,
            job: Arc::clone(job),
            transport: Arc::clone(transport),
            results_tx: results_tx.clone(),
            shutdown_rx: shutdown_tx.subscribe(),
            completion: barrier.handle(worker_id),
        };
        handles.push(tokio::spawn(run_worker(context)));
    }
    drop(results_tx);

    let reports = barrier.wait().await;
    let duration = run_start.elapsed();

    for join_result in join_all(handles).await {
        if let Err(err) = join_result {
            error!("Worker task did not shut down cleanly: {}", err);
        }
    }

    let executed_per_worker: BTreeMap<usize, u64> = reports
        .iter()
        .map(|report| {
            (
                report.worker_id,
                report.completed.saturating_add(report.failed),
            )
        })
        .collect();
    debug!(
        "All {} workers reported; draining {} outcomes",
        reports.len(),
        executed_per_worker.values().sum::<u64>()
    );

    summarize(&mut results_rx, &executed_per_worker, scheduled, duration).map_err(AppError::run)
}
