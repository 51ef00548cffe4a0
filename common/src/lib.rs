//! # Shared Building Blocks
//!
//! Types used across the probe crates: the coalesced address-set model,
//! the closed error/verdict taxonomy and resolved configuration values.
//!
//! Nothing in here touches the network.

pub mod config;
pub mod error;
pub mod net;

mod macros;
