use clap::Parser;
use std::num::{NonZeroU64, NonZeroUsize};
use std::time::Duration;

use super::parsers::parse_duration_arg;
use super::types::HttpMethod;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Concurrent HTTP load generator in Rust - per-phase latency averages for DNS lookup, connection, TLS handshake, server processing, and content transfer across parallel workers."
)]
pub struct LoadArgs {
    /// Target URL
    #[arg(long, short)]
    pub url: Option<String>,

    /// Request body data
    #[arg(long, short, default_value = "")]
    pub data: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "post", ignore_case = true)]
    pub method: HttpMethod,

    /// Number of parallel workers
    #[arg(long, short = 'w', default_value = "1")]
    pub workers: NonZeroUsize,

    /// Number of sequential jobs each worker executes
    #[arg(long = "jobs-per-worker", short = 'j', default_value = "10")]
    pub jobs_per_worker: NonZeroU64,

    /// Pause between consecutive jobs of one worker (whole seconds)
    #[arg(long, default_value = "0")]
    pub pacing: u64,

    /// Request timeout covering send and full response read (supports ms/s/m/h)
    #[arg(
        long = "timeout",
        default_value = "30s",
        value_parser = parse_duration_arg
    )]
    pub request_timeout: Duration,

    /// Timeout for DNS lookup, connect, and TLS handshake together (supports ms/s/m/h)
    #[arg(
        long = "connect-timeout",
        default_value = "10s",
        value_parser = parse_duration_arg
    )]
    pub connect_timeout: Duration,

    /// Accept invalid TLS certificates and hostnames
    #[arg(long)]
    pub insecure: bool,

    /// Print the summary as JSON instead of key-value lines
    #[arg(long)]
    pub json: bool,

    /// Path to config file (TOML/JSON). Defaults to ./phaseload.toml or ./phaseload.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Enable verbose logging (sets log level to debug unless overridden by PHASELOAD_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable ANSI colors in log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}
