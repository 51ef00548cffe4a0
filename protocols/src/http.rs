//! Raw HTTP/1.1 framing and deadline-classified socket I/O.
//!
//! The fingerprinted probes write their requests by hand instead of going
//! through an HTTP client: the bytes on the wire must stay predictable and
//! the response is only ever drained, never parsed.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::debug;

use dpiprobe_common::error::ProbeFailure;

/// One request to serialize onto a probe connection.
pub struct RawRequest<'a> {
    pub method: &'a str,
    /// Absent for bare-address probes; no Host header is written then.
    pub host: Option<&'a str>,
    pub headers: &'a [(String, String)],
    pub body: Option<&'a [u8]>,
}

/// Builds the request bytes: request line, static headers, Host and
/// Content-Length when present, `Connection: close`, then the body.
pub fn serialize_request(req: &RawRequest<'_>) -> Vec<u8> {
    let mut head = format!("{} / HTTP/1.1\r\n", req.method);
    for (name, value) in req.headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    if let Some(host) = req.host {
        head.push_str("Host: ");
        head.push_str(host);
        head.push_str("\r\n");
    }
    if let Some(body) = req.body {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("Connection: close\r\n\r\n");

    let mut out = Vec::with_capacity(head.len() + req.body.map_or(0, <[u8]>::len));
    out.extend_from_slice(head.as_bytes());
    if let Some(body) = req.body {
        out.extend_from_slice(body);
    }
    out
}

/// Writes the whole buffer within `deadline`.
pub async fn write_all<S>(stream: &mut S, data: &[u8], deadline: Duration) -> Result<(), ProbeFailure>
where
    S: AsyncWrite + Unpin,
{
    match timeout(deadline, async {
        stream.write_all(data).await?;
        stream.flush().await
    })
    .await
    {
        Err(_elapsed) => Err(ProbeFailure::WriteTimeout),
        Ok(Err(err)) if err.kind() == io::ErrorKind::TimedOut => Err(ProbeFailure::WriteTimeout),
        Ok(Err(err)) => {
            debug!("probe write: {err}");
            Err(ProbeFailure::Internal)
        }
        Ok(Ok(())) => Ok(()),
    }
}

/// Drains the stream to EOF within `deadline`.
pub async fn read_to_end<S>(stream: &mut S, deadline: Duration) -> Result<Vec<u8>, ProbeFailure>
where
    S: AsyncRead + Unpin,
{
    let mut data = Vec::new();
    match timeout(deadline, stream.read_to_end(&mut data)).await {
        Err(_elapsed) => Err(ProbeFailure::ReadTimeout),
        Ok(Err(err)) if err.kind() == io::ErrorKind::TimedOut => Err(ProbeFailure::ReadTimeout),
        Ok(Err(err)) => {
            debug!("probe read: {err}");
            Err(ProbeFailure::Internal)
        }
        Ok(Ok(_n)) => Ok(data),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
