use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tokio_native_tls::TlsConnector as TokioTlsConnector;
use tracing::debug;

use crate::args::{DEFAULT_USER_AGENT, HttpMethod};
use crate::error::TransportError;
use crate::metrics::TimingRecord;

use super::response::read_response;
use super::{Job, TimedTransport};

trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

type IoStream = Box<dyn AsyncStream>;

struct Established {
    stream: IoStream,
    dns_lookup: Duration,
    tcp_connect: Duration,
    tls_handshake: Duration,
}

struct ExchangeOutcome {
    server_processing: Duration,
    content_transfer: Duration,
    status: http::StatusCode,
    body_bytes: u64,
}

/// HTTP/1.1 transport that opens a fresh connection for every job so DNS,
/// connect, and TLS cost show up in each record. Requests carry
/// `Connection: close`; the response is drained to completion before the
/// transfer phase ends.
pub struct HttpTransport {
    tls: Option<TokioTlsConnector>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport for `job`. The TLS connector is constructed once,
    /// up front, so a broken TLS configuration fails the run before any
    /// worker starts.
    ///
    /// # Errors
    ///
    /// Returns an error when the TLS connector cannot be initialized.
    pub fn new(
        job: &Job,
        connect_timeout: Duration,
        request_timeout: Duration,
        insecure: bool,
    ) -> Result<Self, TransportError> {
        let tls = if job.is_tls() {
            let mut builder = native_tls::TlsConnector::builder();
            if insecure {
                builder
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true);
            }
            let connector = builder
                .build()
                .map_err(|source| TransportError::TlsSetup { source })?;
            Some(TokioTlsConnector::from(connector))
        } else {
            None
        };
        Ok(Self {
            tls,
            connect_timeout,
            request_timeout,
        })
    }

    async fn establish(&self, job: &Job) -> Result<Established, TransportError> {
        let host = job.host();
        let endpoint = format!("{}:{}", host, job.port());

        let dns_start = Instant::now();
        let mut addresses =
            lookup_host(endpoint.as_str())
                .await
                .map_err(|source| TransportError::Dns {
                    host: host.to_owned(),
                    source,
                })?;
        let address = addresses
            .next()
            .ok_or_else(|| TransportError::NoAddressesResolved {
                host: host.to_owned(),
            })?;
        let dns_lookup = dns_start.elapsed();

        let connect_start = Instant::now();
        let tcp = TcpStream::connect(address)
            .await
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;
        let tcp_connect = connect_start.elapsed();

        let Some(connector) = self.tls.as_ref() else {
            return Ok(Established {
                stream: Box::new(tcp),
                dns_lookup,
                tcp_connect,
                tls_handshake: Duration::ZERO,
            });
        };

        let tls_start = Instant::now();
        let stream = connector.connect(host, tcp).await.map_err(|source| {
            TransportError::TlsHandshake {
                host: host.to_owned(),
                source,
            }
        })?;
        Ok(Established {
            stream: Box::new(stream),
            dns_lookup,
            tcp_connect,
            tls_handshake: tls_start.elapsed(),
        })
    }
}

#[async_trait]
impl TimedTransport for HttpTransport {
    async fn perform(&self, job: &Job) -> Result<TimingRecord, TransportError> {
        let established = match timeout(self.connect_timeout, self.establish(job)).await {
            Ok(Ok(established)) => established,
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(TransportError::ConnectTimeout {
                    limit: self.connect_timeout,
                });
            }
        };
        let Established {
            stream,
            dns_lookup,
            tcp_connect,
            tls_handshake,
        } = established;

        let outcome = match timeout(self.request_timeout, exchange(stream, job)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(TransportError::RequestTimeout {
                    limit: self.request_timeout,
                });
            }
        };
        debug!(
            "Response {} drained ({} body bytes)",
            outcome.status, outcome.body_bytes
        );

        Ok(TimingRecord {
            dns_lookup,
            tcp_connect,
            tls_handshake,
            server_processing: outcome.server_processing,
            content_transfer: outcome.content_transfer,
            completed_at: Utc::now(),
        })
    }
}

async fn exchange(mut stream: IoStream, job: &Job) -> Result<ExchangeOutcome, TransportError> {
    let content_length = if job.method == HttpMethod::Post || !job.body.is_empty() {
        Some(job.body.len())
    } else {
        None
    };
    let head = request_head(job, content_length);

    stream
        .write_all(head.as_bytes())
        .await
        .map_err(|source| TransportError::WriteRequest { source })?;
    if content_length.is_some() {
        stream
            .write_all(job.body.as_bytes())
            .await
            .map_err(|source| TransportError::WriteRequest { source })?;
    }
    stream
        .flush()
        .await
        .map_err(|source| TransportError::WriteRequest { source })?;

    // Server processing runs from the flushed request to the first response
    // byte; everything after that counts as content transfer.
    let server_start = Instant::now();
    let mut reader = BufReader::new(stream);
    let first = reader
        .fill_buf()
        .await
        .map_err(|source| TransportError::ReadResponse { source })?;
    if first.is_empty() {
        return Err(TransportError::InvalidResponse {
            detail: "connection closed before the status line".to_owned(),
        });
    }
    let server_processing = server_start.elapsed();

    let transfer_start = Instant::now();
    let response = read_response(&mut reader).await?;
    let content_transfer = transfer_start.elapsed();

    Ok(ExchangeOutcome {
        server_processing,
        content_transfer,
        status: response.status,
        body_bytes: response.body_bytes,
    })
}

fn request_head(job: &Job, content_length: Option<usize>) -> String {
    let host_header = job.url.port().map_or_else(
        || job.host().to_owned(),
        |port| format!("{}:{}", job.host(), port),
    );
    let content_length_line = content_length
        .map_or_else(String::new, |length| {
            format!("Content-Length: {}\r\n", length)
        });
    format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: */*\r\nConnection: close\r\n{}\r\n",
        job.method.as_str(),
        job.request_target(),
        host_header,
        DEFAULT_USER_AGENT,
        content_length_line,
    )
}
