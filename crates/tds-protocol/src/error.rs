//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while interpreting protocol constants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// A column type byte outside the known Sybase/TDS code set.
    #[error("unknown TDS type code: {0:#04x}")]
    UnknownTypeId(u8),

    /// A protocol version string outside the supported table.
    #[error("unrecognized tds version: {0}")]
    UnknownVersion(String),

    /// A result token classification byte outside the known set.
    #[error("unknown result token kind: {0}")]
    UnknownResultKind(u8),
}
