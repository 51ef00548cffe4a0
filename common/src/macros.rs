//! Reporting macros shared by every crate in the workspace.
//!
//! They forward to [`tracing`] so library code stays renderer-agnostic;
//! the CLI formatter decides how each level (and the `success` target)
//! is drawn on a terminal.

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => { tracing::info!(target: "success", $($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { tracing::error!($($arg)*) };
}
