//! Sequential job loop for one worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::metrics::{JobFailure, JobOutcome};
use crate::shutdown::ShutdownReceiver;
use crate::transport::{Job, TimedTransport};

use super::barrier::CompletionHandle;

pub(super) struct WorkerContext {
    pub(super) worker_id: usize,
    pub(super) jobs: u64,
    pub(super) pacing: Duration,
    pub(super) job: Arc<Job>,
    pub(super) transport: Arc<dyn TimedTransport>,
    pub(super) results_tx: mpsc::Sender<JobOutcome>,
    pub(super) shutdown_rx: ShutdownReceiver,
    pub(super) completion: CompletionHandle,
}

/// Runs up to `jobs` requests back to back, pushing one outcome per executed
/// job, and signals the completion barrier when the loop ends for any reason.
pub(super) async fn run_worker(context: WorkerContext) {
    let WorkerContext {
        worker_id,
        jobs,
        pacing,
        job,
        transport,
        results_tx,
        mut shutdown_rx,
        completion,
    } = context;

    let mut completed: u64 = 0;
    let mut failed: u64 = 0;

    for sequence in 1..=jobs {
        if shutdown_requested(&mut shutdown_rx) {
            debug!("Worker {} stopping before job {}", worker_id, sequence);
            break;
        }

        debug!("Worker {} starting job {}", worker_id, sequence);
        let performed = tokio::select! {
            () = wait_for_shutdown(&mut shutdown_rx) => None,
            result = transport.perform(&job) => Some(result),
        };
        let Some(result) = performed else {
            debug!("Worker {} interrupted during job {}", worker_id, sequence);
            break;
        };

        let outcome = match result {
            Ok(record) => {
                completed = completed.saturating_add(1);
                debug!(
                    "Worker {} finished job {} at {}",
                    worker_id, sequence, record.completed_at
                );
                JobOutcome::Completed { worker_id, record }
            }
            Err(err) => {
                let failure = JobFailure {
                    worker_id,
                    job: sequence,
                    kind: err.kind(),
                };
                warn!(
                    "Worker {} job {} failed ({}): {}",
                    failure.worker_id,
                    failure.job,
                    failure.kind.as_str(),
                    err
                );
                failed = failed.saturating_add(1);
                JobOutcome::Failed(failure)
            }
        };
        // Sink capacity covers every scheduled job, so this only fails if
        // the controller went away early.
        if let Err(err) = results_tx.try_send(outcome) {
            error!("Worker {} could not record job {}: {}", worker_id, sequence, err);
        }

        if pacing > Duration::ZERO && sequence < jobs {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {
                    debug!("Worker {} stopping during pacing", worker_id);
                    break;
                }
                () = tokio::time::sleep(pacing) => {}
            }
        }
    }

    completion.signal(completed, failed);
}

fn shutdown_requested(shutdown_rx: &mut ShutdownReceiver) -> bool {
    match shutdown_rx.try_recv() {
        Ok(()) | Err(TryRecvError::Lagged(_)) => true,
        Err(TryRecvError::Empty | TryRecvError::Closed) => false,
    }
}

/// Resolves once a shutdown is broadcast. A closed channel means no signal
/// can ever arrive, so the future stays pending and lets the other select
/// branch win.
async fn wait_for_shutdown(shutdown_rx: &mut ShutdownReceiver) {
    loop {
        match shutdown_rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => return,
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}
