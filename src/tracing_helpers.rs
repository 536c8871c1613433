//! Logging shims that cost nothing unless asked for.
//!
//! Construction code logs through these macros rather than naming the
//! `tracing` crate at every call site. One dispatcher, `log_event!`,
//! carries the feature gate; the per-level wrappers are what the rest of
//! the crate uses. Built without the `tracing` feature (the default),
//! every call site expands to nothing.
//!
//! ```bash
//! # Watch a construction phase by phase
//! RUST_LOG=seqtree=trace cargo test --features tracing
//! ```

/// Forward `(level, fields..)` to the matching `tracing` macro, or expand
/// to nothing when the feature is off.
#[cfg(feature = "tracing")]
macro_rules! log_event {
    ($level:ident, $($arg:tt)*) => {
        tracing::$level!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_event {
    ($level:ident, $($arg:tt)*) => {};
}

/// Phase/extension-grained construction events; the loudest level.
macro_rules! trace_log {
    ($($arg:tt)*) => {
        crate::tracing_helpers::log_event!(trace, $($arg)*)
    };
}

/// Rarer structural events, e.g. an edge-map growth.
macro_rules! debug_log {
    ($($arg:tt)*) => {
        crate::tracing_helpers::log_event!(debug, $($arg)*)
    };
}

pub(crate) use {debug_log, log_event, trace_log};
