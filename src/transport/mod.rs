//! Timed request transport: the per-job measurement seam of the pool.

mod http;
mod response;


pub use http::HttpTransport;

use async_trait::async_trait;
use url::Url;

use crate::args::HttpMethod;
use crate::error::{TransportError, ValidationError};
use crate::metrics::TimingRecord;

/// One configured unit of work. Every job of a run shares the same method,
/// URL, and body; only the ordinal a worker executes it at differs.
#[derive(Debug, Clone)]
pub struct Job {
    pub method: HttpMethod,
    pub url: Url,
    pub body: String,
}

impl Job {
    /// Parses and validates the target URL into an immutable job spec.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL does not parse, has no host, or uses a
    /// scheme other than http/https. These are fatal before any worker runs.
    pub fn new(method: HttpMethod, raw_url: &str, body: String) -> Result<Self, ValidationError> {
        let url = Url::parse(raw_url).map_err(|source| ValidationError::InvalidUrl {
            url: raw_url.to_owned(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ValidationError::UnsupportedScheme {
                    scheme: other.to_owned(),
                });
            }
        }
        if url.host_str().is_none() {
            return Err(ValidationError::UrlMissingHost);
        }
        Ok(Self { method, url, body })
    }

    #[must_use]
    pub(crate) fn is_tls(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Host is validated at construction; empty only if the spec was built
    /// without [`Job::new`].
    #[must_use]
    pub(crate) fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    #[must_use]
    pub(crate) fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(80)
    }

    /// Path plus query, as written on the request line.
    #[must_use]
    pub(crate) fn request_target(&self) -> String {
        let path = self.url.path();
        self.url
            .query()
            .map_or_else(|| path.to_owned(), |query| format!("{}?{}", path, query))
    }
}

/// Performs one request per call and reports the wall-clock time spent in
/// each phase. Implementations must drain the full response body before
/// returning so content transfer is measured to completion.
#[async_trait]
pub trait TimedTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns the phase-classified failure when any step of the request
    /// fails or runs past its deadline.
    async fn perform(&self, job: &Job) -> Result<TimingRecord, TransportError>;
}
