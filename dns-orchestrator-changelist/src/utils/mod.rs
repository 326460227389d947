//! Utility modules.

/// Millisecond `Duration` serde helpers used by configuration types.
pub mod duration_ms;

/// One-line previews of request and response bodies.
pub mod body_preview;
