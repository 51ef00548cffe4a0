//! # Censorship Checkers
//!
//! Stateless probe protocols. Each checker is independently invocable,
//! holds nothing between invocations, and returns plain classification
//! values; a failing probe is a result, not an abort.

pub mod attrs;
pub mod cidrwhitelist;
pub mod endpoint;
pub mod tcp1620;
pub mod webhost;
pub mod whoami;
