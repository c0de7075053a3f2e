//! Completion barrier: exactly one report per worker, on every exit path.

use tokio::sync::mpsc;

/// Final accounting a worker submits once when it stops, whether it finished
/// its schedule, broke off early, or was torn down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerReport {
    pub(crate) worker_id: usize,
    pub(crate) completed: u64,
    pub(crate) failed: u64,
}

/// Owned by the controller for the duration of one run. The run may not
/// drain the result sink until [`CompletionBarrier::wait`] has returned.
pub(crate) struct CompletionBarrier {
    report_tx: mpsc::Sender<WorkerReport>,
    report_rx: mpsc::Receiver<WorkerReport>,
    workers: usize,
}

impl CompletionBarrier {
    pub(crate) fn new(workers: usize) -> Self {
        let (report_tx, report_rx) = mpsc::channel(workers.max(1));
        Self {
            report_tx,
            report_rx,
            workers,
        }
    }

    /// Hands out the reporting side for one worker. A handle dropped without
    /// signalling still delivers a zeroed report, so a panicked or cancelled
    /// worker cannot wedge [`CompletionBarrier::wait`].
    pub(crate) fn handle(&self, worker_id: usize) -> CompletionHandle {
        CompletionHandle {
            report_tx: self.report_tx.clone(),
            worker_id,
            signaled: false,
        }
    }

    /// Collects one report per worker. Call only after every handle has been
    /// handed out; the barrier's own sender is dropped here so the channel
    /// closes once the last handle is gone.
    pub(crate) async fn wait(self) -> Vec<WorkerReport> {
        let Self {
            report_tx,
            mut report_rx,
            workers,
        } = self;
        drop(report_tx);

        let mut reports = Vec::with_capacity(workers);
        while reports.len() < workers {
            match report_rx.recv().await {
                Some(report) => reports.push(report),
                None => break,
            }
        }
        reports
    }
}

/// One worker's side of the barrier. Consuming [`CompletionHandle::signal`]
/// or dropping the handle reports exactly once, never twice.
pub(crate) struct CompletionHandle {
    report_tx: mpsc::Sender<WorkerReport>,
    worker_id: usize,
    signaled: bool,
}

impl CompletionHandle {
    pub(crate) fn signal(mut self, completed: u64, failed: u64) {
        self.signaled = true;
        // Channel capacity equals the worker count, so one report per live
        // handle always fits.
        drop(self.report_tx.try_send(WorkerReport {
            worker_id: self.worker_id,
            completed,
            failed,
        }));
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if !self.signaled {
            drop(self.report_tx.try_send(WorkerReport {
                worker_id: self.worker_id,
                completed: 0,
                failed: 0,
            }));
        }
    }
}
