//! Response head parsing and body draining for `Connection: close` requests.

use http::StatusCode;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt};

use crate::error::TransportError;

/// Interim (1xx) responses tolerated before the final status arrives.
const INTERIM_RESPONSE_LIMIT: usize = 4;

pub(super) struct ResponseSummary {
    pub(super) status: StatusCode,
    pub(super) body_bytes: u64,
}

struct HeadFields {
    content_length: Option<u64>,
    chunked: bool,
}

enum BodyPlan {
    None,
    Chunked,
    Sized(u64),
    ToEnd,
}

/// Reads one full response, draining the body according to its framing.
/// Interim 1xx responses are skipped until the final status arrives.
pub(super) async fn read_response<R>(reader: &mut R) -> Result<ResponseSummary, TransportError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut interim = 0_usize;
    loop {
        let status = parse_status_line(&read_crlf_line(reader).await?)?;
        let fields = read_head_fields(reader).await?;
        if status.is_informational() {
            interim = interim.saturating_add(1);
            if interim > INTERIM_RESPONSE_LIMIT {
                return Err(malformed(
                    "too many interim responses before the final status".to_owned(),
                ));
            }
            continue;
        }
        let body_bytes = match body_plan(status, &fields) {
            BodyPlan::None => 0,
            BodyPlan::Chunked => drain_chunked(reader).await?,
            BodyPlan::Sized(length) => drain_exact(reader, length).await?,
            BodyPlan::ToEnd => drain_to_end(reader).await?,
        };
        return Ok(ResponseSummary { status, body_bytes });
    }
}

fn parse_status_line(line: &str) -> Result<StatusCode, TransportError> {
    let mut parts = line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(malformed(format!("unexpected status line '{}'", line)));
    }
    let code = parts
        .next()
        .ok_or_else(|| malformed(format!("status line without a code: '{}'", line)))?;
    let code = code
        .parse::<u16>()
        .map_err(|err| malformed(format!("non-numeric status code '{}': {}", code, err)))?;
    StatusCode::from_u16(code).map_err(|err| malformed(format!("status code {}: {}", code, err)))
}

async fn read_head_fields<R>(reader: &mut R) -> Result<HeadFields, TransportError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut fields = HeadFields {
        content_length: None,
        chunked: false,
    };
    loop {
        let line = read_crlf_line(reader).await?;
        if line.is_empty() {
            return Ok(fields);
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(malformed(format!("header line without a colon: '{}'", line)));
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            let length = value
                .parse::<u64>()
                .map_err(|err| malformed(format!("Content-Length '{}': {}", value, err)))?;
            fields.content_length = Some(length);
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && value.to_ascii_lowercase().contains("chunked")
        {
            fields.chunked = true;
        }
    }
}

fn body_plan(status: StatusCode, fields: &HeadFields) -> BodyPlan {
    if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return BodyPlan::None;
    }
    if fields.chunked {
        return BodyPlan::Chunked;
    }
    fields.content_length.map_or(BodyPlan::ToEnd, BodyPlan::Sized)
}

async fn drain_chunked<R>(reader: &mut R) -> Result<u64, TransportError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut total = 0_u64;
    loop {
        let line = read_crlf_line(reader).await?;
        let size_token = line
            .split_once(';')
            .map_or_else(|| line.as_str(), |(token, _)| token)
            .trim();
        let size = u64::from_str_radix(size_token, 16)
            .map_err(|err| malformed(format!("chunk size '{}': {}", size_token, err)))?;
        if size == 0 {
            // Trailer section runs until its own blank line.
            loop {
                if read_crlf_line(reader).await?.is_empty() {
                    return Ok(total);
                }
            }
        }
        total = total.saturating_add(drain_exact(reader, size).await?);
        let terminator = read_crlf_line(reader).await?;
        if !terminator.is_empty() {
            return Err(malformed(format!(
                "chunk not followed by CRLF: '{}'",
                terminator
            )));
        }
    }
}

async fn drain_exact<R>(reader: &mut R, expected: u64) -> Result<u64, TransportError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut limited = reader.take(expected);
    let copied = tokio::io::copy(&mut limited, &mut tokio::io::sink())
        .await
        .map_err(|source| TransportError::ReadResponse { source })?;
    if copied < expected {
        return Err(malformed(format!(
            "body ended after {} of {} bytes",
            copied, expected
        )));
    }
    Ok(copied)
}

async fn drain_to_end<R>(reader: &mut R) -> Result<u64, TransportError>
where
    R: AsyncRead + Unpin + Send,
{
    tokio::io::copy(reader, &mut tokio::io::sink())
        .await
        .map_err(|source| TransportError::ReadResponse { source })
}

async fn read_crlf_line<R>(reader: &mut R) -> Result<String, TransportError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|source| TransportError::ReadResponse { source })?;
    if read == 0 {
        return Err(malformed("stream ended inside the response head".to_owned()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

const fn malformed(detail: String) -> TransportError {
    TransportError::InvalidResponse { detail }
}
