//! # Censorship Measurement Core
//!
//! The four subsystems every check is assembled from:
//!
//! 1. [`intel`] — attribution store answering longest-prefix-match and
//!    criteria queries over loaded ASN/org/country datasets.
//! 2. [`filter`] — the set-expression language compiling to address sets.
//! 3. [`farm`] — weighted random discovery of live TLS hosts inside a set.
//! 4. [`pool`] — the bounded generic worker pool the checkers run on.
//!
//! [`checkers`] holds the probe protocols themselves; [`ripe`] is the
//! external attribution API client. Everything emits plain result values;
//! rendering belongs to the caller.

pub mod checkers;
pub mod farm;
pub mod filter;
pub mod intel;
pub mod pool;
pub mod ripe;
