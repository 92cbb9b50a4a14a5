//! Type conversion error types.

use thiserror::Error;

/// Errors that can occur while decoding, converting or quoting values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// Value is null when non-null was expected.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// Type mismatch during conversion.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: String,
    },

    /// Value is out of range for target type.
    #[error("value out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
    },

    /// Text could not be represented in the requested charset, or the
    /// charset itself is unknown.
    #[error("invalid string encoding: {0}")]
    InvalidEncoding(String),

    /// Invalid binary data.
    #[error("invalid binary data: {0}")]
    InvalidBinary(String),

    /// Invalid date/time value.
    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    /// Invalid decimal value.
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    /// Invalid UUID value.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// Buffer too small for value.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes needed.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// Value kind that has no SQL literal form.
    #[error("{type_name} is not a supported parameter type")]
    UnsupportedType {
        /// Type name of the rejected value.
        type_name: &'static str,
    },

    /// A `%(key)s` placeholder with no matching named parameter.
    #[error("params dictionary did not contain value for placeholder: {0}")]
    MissingPlaceholder(String),

    /// More `%s`/`%d` placeholders than positional parameters.
    #[error("more placeholders in sql than params available")]
    InsufficientParameters,
}
