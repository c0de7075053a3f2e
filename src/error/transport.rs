use std::time::Duration;

use thiserror::Error;

use crate::metrics::FailureKind;

/// Failure raised while performing one timed request. Carried through the
/// result sink as a per-job outcome, never fatal to the pool.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("DNS lookup for {host} failed: {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No addresses resolved for {host}.")]
    NoAddressesResolved { host: String },
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to build TLS connector: {source}")]
    TlsSetup {
        #[source]
        source: native_tls::Error,
    },
    #[error("TLS handshake with {host} failed: {source}")]
    TlsHandshake {
        host: String,
        #[source]
        source: native_tls::Error,
    },
    #[error("Failed to write request: {source}")]
    WriteRequest {
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read response: {source}")]
    ReadResponse {
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed response: {detail}")]
    InvalidResponse { detail: String },
    #[error("Connect phase exceeded {limit:?}.")]
    ConnectTimeout { limit: Duration },
    #[error("Request exceeded {limit:?}.")]
    RequestTimeout { limit: Duration },
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

impl TransportError {
    /// Collapses the failure into the category recorded on its job outcome.
    #[must_use]
    pub(crate) const fn kind(&self) -> FailureKind {
        match self {
            Self::Dns { .. } | Self::NoAddressesResolved { .. } => FailureKind::Dns,
            Self::Connect { .. } => FailureKind::Connect,
            Self::TlsSetup { .. } | Self::TlsHandshake { .. } => FailureKind::Tls,
            Self::WriteRequest { .. } => FailureKind::RequestWrite,
            Self::ReadResponse { .. } => FailureKind::ResponseRead,
            Self::InvalidResponse { .. } => FailureKind::InvalidResponse,
            Self::ConnectTimeout { .. } | Self::RequestTimeout { .. } => FailureKind::Timeout,
            #[cfg(test)]
            Self::TestExpectation { .. } | Self::TestExpectationValue { .. } => {
                FailureKind::InvalidResponse
            }
        }
    }
}
