use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL is missing host.")]
    UrlMissingHost,
    #[error("Unsupported scheme '{scheme}'. Use http or https.")]
    UnsupportedScheme { scheme: String },
    #[error("Missing URL (set --url or provide in config).")]
    MissingUrl,
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Total job count {workers} x {jobs_per_worker} overflows.")]
    JobTotalOverflow { workers: u64, jobs_per_worker: u64 },
    #[error("Invalid duration '{value}'. Use digits with an optional ms, s, m, or h suffix.")]
    InvalidDuration { value: String },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Duration must be > 0.")]
    DurationZero,
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
