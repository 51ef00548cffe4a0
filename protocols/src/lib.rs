//! # Wire-Level Probe Primitives
//!
//! The pieces a censorship probe is assembled from: a TLS connector whose
//! client hello matches a mainstream browser, and raw HTTP/1.1 framing with
//! deadline-classified socket I/O. Everything here operates on a single
//! connection handed in by the caller; session orchestration lives upstream.

pub mod http;
pub mod tls;
