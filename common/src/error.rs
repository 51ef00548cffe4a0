//! Closed error and classification taxonomy.
//!
//! Per-probe network failures are never surfaced as raw I/O errors; they are
//! folded into [`ProbeFailure`] so callers and tests can match structurally.

use thiserror::Error;

/// Classification of a failed network probe phase.
///
/// One failing probe never aborts its siblings; the kind is carried in the
/// probe's result instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ProbeFailure {
    #[error("tcp connection timeout")]
    ConnTimeout,
    #[error("tls handshake timeout")]
    HandshakeTimeout,
    #[error("tls handshake failure")]
    HandshakeFailure,
    #[error("tcp write timeout")]
    WriteTimeout,
    #[error("tcp read timeout")]
    ReadTimeout,
    #[error("connection error")]
    ConnectionError,
    #[error("internal error")]
    Internal,
}

/// Errors produced by the subnet filter engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("filter syntax error: {0}")]
    Syntax(String),
    #[error("filter eval error: {0}")]
    Eval(String),
}

/// Outcome of the CIDR-whitelist race.
///
/// A single success on the regular list is final and wins over anything the
/// whitelisted list did or would have done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistVerdict {
    NotDetected,
    Detected,
    NoInternetAccess,
}

/// Outcome of one byte-read signature probe.
///
/// `ReadError` means the connection came up but died before the target byte
/// count arrived, which is the signature being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tcp1620Verdict {
    Clean,
    ConnectionError,
    ReadError,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
