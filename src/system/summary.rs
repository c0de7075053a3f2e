//! Final report rendering, human-readable and JSON.

use std::time::Duration;

use serde_json::{Value, json};

use crate::error::AppResult;
use crate::metrics::{PhaseAverages, RunSummary};

/// Milliseconds with two decimals, computed in integer microseconds.
fn format_millis(duration: Duration) -> String {
    let scaled = duration.as_micros() / 10;
    format!("{}.{:02}ms", scaled / 100, scaled % 100)
}

/// Seconds with two decimals, computed in integer milliseconds.
fn format_seconds(duration: Duration) -> String {
    let scaled = duration.as_millis() / 10;
    format!("{}.{:02}s", scaled / 100, scaled % 100)
}

fn print_averages(averages: &PhaseAverages) {
    println!("Avg DNS lookup:        {}", format_millis(averages.dns_lookup));
    println!("Avg TCP connection:    {}", format_millis(averages.tcp_connect));
    println!("Avg TLS handshake:     {}", format_millis(averages.tls_handshake));
    println!(
        "Avg server processing: {}",
        format_millis(averages.server_processing)
    );
    println!(
        "Avg content transfer:  {}",
        format_millis(averages.content_transfer)
    );
}

pub(crate) fn print_summary(summary: &RunSummary) {
    println!("Run duration:   {}", format_seconds(summary.duration));
    println!("Scheduled jobs: {}", summary.scheduled_jobs);
    println!("Completed jobs: {}", summary.completed_jobs);
    println!("Failed jobs:    {}", summary.failed_jobs);
    println!("Timed out jobs: {}", summary.timed_out_jobs);
    println!("Cancelled jobs: {}", summary.cancelled_jobs);
    summary
        .averages
        .as_ref()
        .map_or_else(|| println!("No timing data captured."), print_averages);
}

const fn to_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

pub(crate) fn summary_json(summary: &RunSummary) -> Value {
    let averages = summary.averages.as_ref().map_or(Value::Null, |averages| {
        json!({
            "dns_lookup_ms": to_millis(averages.dns_lookup),
            "tcp_connect_ms": to_millis(averages.tcp_connect),
            "tls_handshake_ms": to_millis(averages.tls_handshake),
            "server_processing_ms": to_millis(averages.server_processing),
            "content_transfer_ms": to_millis(averages.content_transfer),
        })
    });
    json!({
        "duration_ms": to_millis(summary.duration),
        "scheduled_jobs": summary.scheduled_jobs,
        "completed_jobs": summary.completed_jobs,
        "failed_jobs": summary.failed_jobs,
        "timed_out_jobs": summary.timed_out_jobs,
        "cancelled_jobs": summary.cancelled_jobs,
        "phase_averages_ms": averages,
    })
}

/// # Errors
///
/// Fails when the summary cannot be serialized.
pub(crate) fn print_json_summary(summary: &RunSummary) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(&summary_json(summary))?);
    Ok(())
}
