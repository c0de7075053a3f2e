use std::num::{NonZeroU64, NonZeroUsize};

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::LoadArgs;
use crate::error::{AppResult, ConfigError, ValidationError};

use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to CLI arguments. A config value is only
/// applied when the matching flag was absent from the command line.
///
/// # Errors
///
/// Returns an error when a config value fails validation.
pub fn apply_config(
    args: &mut LoadArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "url")
        && let Some(url) = config.url.clone()
    {
        args.url = Some(url);
    }

    if !is_cli(matches, "data")
        && let Some(data) = config.data.clone()
    {
        args.data = data;
    }

    if !is_cli(matches, "method")
        && let Some(method) = config.method
    {
        args.method = method;
    }

    if !is_cli(matches, "workers")
        && let Some(workers) = config.workers
    {
        args.workers = ensure_positive_usize(workers, "workers")?;
    }

    if !is_cli(matches, "jobs_per_worker")
        && let Some(jobs) = config.jobs_per_worker
    {
        args.jobs_per_worker = ensure_positive_u64(jobs, "jobs_per_worker")?;
    }

    if !is_cli(matches, "pacing")
        && let Some(pacing) = config.pacing
    {
        args.pacing = pacing;
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = ensure_duration(timeout, "timeout")?;
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = ensure_duration(timeout, "connect_timeout")?;
    }

    if !is_cli(matches, "insecure")
        && let Some(insecure) = config.insecure
    {
        args.insecure = insecure;
    }

    if !is_cli(matches, "json")
        && let Some(json) = config.json
    {
        args.json = json;
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_u64(value: u64, field: &str) -> Result<NonZeroU64, ConfigError> {
    NonZeroU64::new(value).ok_or_else(|| ConfigError::FieldMustBePositive {
        field: field.to_owned(),
        source: ValidationError::ValueTooSmall { min: 1 },
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(value).ok_or_else(|| ConfigError::FieldMustBePositive {
        field: field.to_owned(),
        source: ValidationError::ValueTooSmall { min: 1 },
    })
}

fn ensure_duration(value: &DurationValue, field: &str) -> Result<std::time::Duration, ConfigError> {
    value
        .to_duration()
        .map_err(|err| ConfigError::InvalidDuration {
            field: field.to_owned(),
            source: err,
        })
}
