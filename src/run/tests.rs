use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::args::HttpMethod;
use crate::error::{AppError, AppResult, TransportError, ValidationError};
use crate::metrics::{RunSummary, TimingRecord};
use crate::shutdown::{ShutdownSender, shutdown_channel};
use crate::transport::{Job, TimedTransport};

use super::barrier::CompletionBarrier;
use super::{RunPlan, execute};

const RUN_DEADLINE: Duration = Duration::from_secs(5);

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

const fn plan(workers: usize, jobs_per_worker: u64, pacing: Duration) -> RunPlan {
    RunPlan {
        workers,
        jobs_per_worker,
        pacing,
    }
}

fn sample_job() -> AppResult<Arc<Job>> {
    Ok(Arc::new(Job::new(
        HttpMethod::Get,
        "http://pool.test.invalid/",
        String::new(),
    )?))
}

fn record_with_millis(dns: u64, connect: u64, tls: u64, server: u64, transfer: u64) -> TimingRecord {
    TimingRecord {
        dns_lookup: Duration::from_millis(dns),
        tcp_connect: Duration::from_millis(connect),
        tls_handshake: Duration::from_millis(tls),
        server_processing: Duration::from_millis(server),
        content_transfer: Duration::from_millis(transfer),
        completed_at: Utc::now(),
    }
}

fn expect_count(label: &str, actual: u64, expected_value: u64) -> AppResult<()> {
    if actual == expected_value {
        Ok(())
    } else {
        Err(AppError::run(format!(
            "{} was {}, expected {}",
            label, actual, expected_value
        )))
    }
}

fn expect_duration(label: &str, actual: Duration, expected_value: Duration) -> AppResult<()> {
    if actual == expected_value {
        Ok(())
    } else {
        Err(AppError::run(format!(
            "{} was {:?}, expected {:?}",
            label, actual, expected_value
        )))
    }
}

async fn execute_within_deadline(
    run_plan: RunPlan,
    transport: &Arc<dyn TimedTransport>,
    shutdown_tx: &ShutdownSender,
) -> AppResult<RunSummary> {
    let job = sample_job()?;
    tokio::time::timeout(RUN_DEADLINE, execute(run_plan, &job, transport, shutdown_tx))
        .await
        .map_err(|err| AppError::run(format!("Run did not finish in time: {}", err)))?
}

struct FixedTransport {
    record: TimingRecord,
    delay: Duration,
}

#[async_trait]
impl TimedTransport for FixedTransport {
    async fn perform(&self, _job: &Job) -> Result<TimingRecord, TransportError> {
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.record)
    }
}

struct FailEveryOther {
    record: TimingRecord,
    calls: AtomicU64,
}

#[async_trait]
impl TimedTransport for FailEveryOther {
    async fn perform(&self, _job: &Job) -> Result<TimingRecord, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call % 2 == 1 {
            return Err(TransportError::NoAddressesResolved {
                host: "pool.test.invalid".to_owned(),
            });
        }
        Ok(self.record)
    }
}

struct StalledTransport;

#[async_trait]
impl TimedTransport for StalledTransport {
    async fn perform(&self, _job: &Job) -> Result<TimingRecord, TransportError> {
        std::future::pending::<()>().await;
        Err(TransportError::NoAddressesResolved {
            host: "pool.test.invalid".to_owned(),
        })
    }
}

#[test]
fn fleet_runs_every_scheduled_job() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let transport: Arc<dyn TimedTransport> = Arc::new(FixedTransport {
            record: record_with_millis(1, 1, 0, 1, 1),
            delay: Duration::ZERO,
        });
        let summary =
            execute_within_deadline(plan(4, 8, Duration::ZERO), &transport, &shutdown_tx).await?;

        expect_count("scheduled jobs", summary.scheduled_jobs, 32)?;
        expect_count("completed jobs", summary.completed_jobs, 32)?;
        expect_count("failed jobs", summary.failed_jobs, 0)?;
        expect_count("cancelled jobs", summary.cancelled_jobs, 0)?;
        if summary.averages.is_none() {
            return Err(AppError::run("Averages missing for a run with data"));
        }
        Ok(())
    })
}

#[test]
fn two_workers_three_jobs_average_exactly() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let transport: Arc<dyn TimedTransport> = Arc::new(FixedTransport {
            record: record_with_millis(1, 2, 0, 3, 4),
            delay: Duration::ZERO,
        });
        let summary =
            execute_within_deadline(plan(2, 3, Duration::ZERO), &transport, &shutdown_tx).await?;

        expect_count("completed jobs", summary.completed_jobs, 6)?;
        let Some(averages) = summary.averages else {
            return Err(AppError::run("Averages missing for a completed run"));
        };
        expect_duration("dns average", averages.dns_lookup, Duration::from_millis(1))?;
        expect_duration("connect average", averages.tcp_connect, Duration::from_millis(2))?;
        expect_duration("tls average", averages.tls_handshake, Duration::ZERO)?;
        expect_duration(
            "server average",
            averages.server_processing,
            Duration::from_millis(3),
        )?;
        expect_duration(
            "transfer average",
            averages.content_transfer,
            Duration::from_millis(4),
        )?;
        Ok(())
    })
}

#[test]
fn failures_reach_the_sink_and_barrier() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let transport: Arc<dyn TimedTransport> = Arc::new(FailEveryOther {
            record: record_with_millis(1, 1, 0, 1, 1),
            calls: AtomicU64::new(0),
        });
        let summary =
            execute_within_deadline(plan(3, 4, Duration::ZERO), &transport, &shutdown_tx).await?;

        expect_count("scheduled jobs", summary.scheduled_jobs, 12)?;
        expect_count("completed jobs", summary.completed_jobs, 6)?;
        expect_count("failed jobs", summary.failed_jobs, 6)?;
        expect_count("timed out jobs", summary.timed_out_jobs, 0)?;
        expect_count("cancelled jobs", summary.cancelled_jobs, 0)?;
        if summary.averages.is_none() {
            return Err(AppError::run("Averages missing despite completed jobs"));
        }
        Ok(())
    })
}

#[test]
fn pacing_spaces_consecutive_jobs() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let transport: Arc<dyn TimedTransport> = Arc::new(FixedTransport {
            record: record_with_millis(1, 1, 0, 1, 1),
            delay: Duration::ZERO,
        });
        let pacing = Duration::from_millis(20);
        let summary =
            execute_within_deadline(plan(1, 3, pacing), &transport, &shutdown_tx).await?;

        expect_count("completed jobs", summary.completed_jobs, 3)?;
        let floor = Duration::from_millis(40);
        if summary.duration < floor {
            return Err(AppError::run(format!(
                "Run took {:?}, expected at least {:?} of pacing",
                summary.duration, floor
            )));
        }
        Ok(())
    })
}

#[test]
fn shutdown_before_first_completion_cancels_everything() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let transport: Arc<dyn TimedTransport> = Arc::new(StalledTransport);
        let job = sample_job()?;
        let run = execute(plan(2, 5, Duration::ZERO), &job, &transport, &shutdown_tx);
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            drop(shutdown_tx.send(()));
        };

        let (summary, ()) = tokio::time::timeout(RUN_DEADLINE, async { tokio::join!(run, trigger) })
            .await
            .map_err(|err| AppError::run(format!("Run did not finish in time: {}", err)))?;
        let summary = summary?;

        expect_count("completed jobs", summary.completed_jobs, 0)?;
        expect_count("failed jobs", summary.failed_jobs, 0)?;
        expect_count("cancelled jobs", summary.cancelled_jobs, 10)?;
        if summary.averages.is_some() {
            return Err(AppError::run("Averages should be absent when nothing ran"));
        }
        Ok(())
    })
}

#[test]
fn mid_run_shutdown_keeps_finished_work() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let transport: Arc<dyn TimedTransport> = Arc::new(FixedTransport {
            record: record_with_millis(1, 1, 0, 1, 1),
            delay: Duration::from_millis(25),
        });
        let job = sample_job()?;
        let run = execute(plan(1, 50, Duration::ZERO), &job, &transport, &shutdown_tx);
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(70)).await;
            drop(shutdown_tx.send(()));
        };

        let (summary, ()) = tokio::time::timeout(RUN_DEADLINE, async { tokio::join!(run, trigger) })
            .await
            .map_err(|err| AppError::run(format!("Run did not finish in time: {}", err)))?;
        let summary = summary?;

        let executed = summary.completed_jobs.saturating_add(summary.failed_jobs);
        if executed == 0 {
            return Err(AppError::run("Expected at least one executed job"));
        }
        if summary.cancelled_jobs == 0 {
            return Err(AppError::run("Expected cancelled jobs after shutdown"));
        }
        expect_count(
            "schedule accounting",
            executed.saturating_add(summary.cancelled_jobs),
            50,
        )?;
        Ok(())
    })
}

#[test]
fn dropped_handle_reports_zero_counts() -> AppResult<()> {
    run_async_test(async {
        let barrier = CompletionBarrier::new(2);
        let first = barrier.handle(1);
        let second = barrier.handle(2);

        first.signal(3, 1);
        drop(second);

        let reports = tokio::time::timeout(RUN_DEADLINE, barrier.wait())
            .await
            .map_err(|err| AppError::run(format!("Barrier did not release: {}", err)))?;
        if reports.len() != 2 {
            return Err(AppError::run(format!(
                "Expected 2 reports, got {}",
                reports.len()
            )));
        }

        let signalled = reports
            .iter()
            .find(|report| report.worker_id == 1)
            .ok_or_else(|| AppError::run("Missing report for worker 1"))?;
        expect_count("worker 1 completed", signalled.completed, 3)?;
        expect_count("worker 1 failed", signalled.failed, 1)?;

        let dropped = reports
            .iter()
            .find(|report| report.worker_id == 2)
            .ok_or_else(|| AppError::run("Missing report for worker 2"))?;
        expect_count("worker 2 completed", dropped.completed, 0)?;
        expect_count("worker 2 failed", dropped.failed, 0)?;
        Ok(())
    })
}

#[test]
fn schedule_overflow_is_rejected() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let transport: Arc<dyn TimedTransport> = Arc::new(StalledTransport);
        let job = sample_job()?;
        let result =
            execute(plan(2, u64::MAX, Duration::ZERO), &job, &transport, &shutdown_tx).await;

        let Err(AppError::Validation(ValidationError::JobTotalOverflow { .. })) = result else {
            return Err(AppError::run("Expected a schedule overflow error"));
        };
        Ok(())
    })
}
