//! Error types for the `brokerlink-models` crate.
//!
//! Parsing and validation helpers in this crate return variants of
//! [`ModelError`].

/// Errors produced when parsing or validating model values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// An authentication scheme name did not match any supported scheme.
    #[error("unknown authentication scheme \"{value}\"")]
    UnknownAuthenticationScheme {
        /// The value that failed to parse.
        value: String,
    },
}
