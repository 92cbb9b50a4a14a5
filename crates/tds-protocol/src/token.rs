//! Result token classification.
//!
//! The session never parses raw tokens itself. The transport frames the
//! response stream and reports each pulled token as a [`PulledToken`]: a
//! transport status, the token's [`ResultKind`] and, for completion tokens,
//! its [`DoneStatus`] flags.
//!
//! ```text
//! ROWFMT ─▶ ROW ─▶ ROW ─▶ DONE(COUNT)          single SELECT
//! DONE(COUNT) ─▶ ROWFMT ─▶ ROW ─▶ DONE         INSERT; SELECT
//! DONEINPROC ─▶ ... ─▶ DONEPROC                 stored procedure
//! ```

use bitflags::bitflags;

use crate::error::ProtocolError;

/// Classification of a result-bearing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultKind {
    /// Column metadata for a regular result (COLMETADATA / ROWFMT).
    RowFormat = 0x81,
    /// Column metadata for a COMPUTE clause (ALTMETADATA).
    ComputeFormat = 0x88,
    /// A regular row (ROW / NBCROW).
    Row = 0xD1,
    /// A COMPUTE row (ALTROW).
    Compute = 0xD3,
    /// Statement completion (DONE).
    Done = 0xFD,
    /// Stored procedure completion (DONEPROC).
    DoneProc = 0xFE,
    /// Statement completion inside a stored procedure (DONEINPROC).
    DoneInProc = 0xFF,
}

impl ResultKind {
    /// Create a result kind from a raw token byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x81 | 0xEE => Some(Self::RowFormat),
            0x88 => Some(Self::ComputeFormat),
            0xD1 | 0xD2 => Some(Self::Row),
            0xD3 => Some(Self::Compute),
            0xFD => Some(Self::Done),
            0xFE => Some(Self::DoneProc),
            0xFF => Some(Self::DoneInProc),
            _ => None,
        }
    }

    /// Check if this is one of the three completion tokens.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done | Self::DoneProc | Self::DoneInProc)
    }

    /// Check if this token carries column metadata.
    #[must_use]
    pub const fn is_format(self) -> bool {
        matches!(self, Self::RowFormat | Self::ComputeFormat)
    }

    /// Check if the cursor is positioned on row data after this token.
    #[must_use]
    pub const fn is_row_bearing(self) -> bool {
        matches!(self, Self::Row | Self::Compute)
    }
}

impl TryFrom<u8> for ResultKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(ProtocolError::UnknownResultKind(value))
    }
}

bitflags! {
    /// DONE, DONEPROC and DONEINPROC status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DoneStatus: u16 {
        /// More results follow.
        const MORE = 0x0001;
        /// Error occurred.
        const ERROR = 0x0002;
        /// Transaction in progress.
        const INXACT = 0x0004;
        /// Completion of a stored procedure.
        const PROC = 0x0008;
        /// Row count is valid.
        const COUNT = 0x0010;
        /// The statement was cancelled (attention acknowledgment).
        const CANCELLED = 0x0020;
        /// Event notification.
        const EVENT = 0x0040;
        /// Server error caused statement termination.
        const SRVERROR = 0x0100;
    }
}

impl DoneStatus {
    /// Check if the completed statement failed.
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.intersects(Self::ERROR.union(Self::SRVERROR))
    }
}

/// Transport-level outcome of a token pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenStatus {
    /// A token was read.
    Success,
    /// The response stream is exhausted.
    NoMoreResults,
    /// The transport could not read the stream.
    Failed,
}

/// Which tokens a pull is allowed to stop on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenFilter {
    /// Stop on format, row and completion tokens.
    #[default]
    Results,
    /// Stop only on completion tokens, skipping rows.
    Trailing,
}

/// One token as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PulledToken {
    /// Transport status of the pull.
    pub status: TokenStatus,
    /// Token classification. `None` unless `status` is `Success`.
    pub kind: Option<ResultKind>,
    /// Completion flags. Empty for non-completion tokens.
    pub done: DoneStatus,
}

impl PulledToken {
    /// A non-completion token.
    #[must_use]
    pub const fn token(kind: ResultKind) -> Self {
        Self {
            status: TokenStatus::Success,
            kind: Some(kind),
            done: DoneStatus::empty(),
        }
    }

    /// A completion token with its flags.
    #[must_use]
    pub const fn done(kind: ResultKind, done: DoneStatus) -> Self {
        Self {
            status: TokenStatus::Success,
            kind: Some(kind),
            done,
        }
    }

    /// The end of the response stream.
    #[must_use]
    pub const fn no_more_results() -> Self {
        Self {
            status: TokenStatus::NoMoreResults,
            kind: None,
            done: DoneStatus::empty(),
        }
    }

    /// A failed pull.
    #[must_use]
    pub const fn failed() -> Self {
        Self {
            status: TokenStatus::Failed,
            kind: None,
            done: DoneStatus::empty(),
        }
    }

    /// Check if this token ends the statement with an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == TokenStatus::Failed
            || (self.kind.is_some_and(ResultKind::is_done) && self.done.is_error())
    }
}

/// Which kind of row the cursor is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// A regular result row.
    Regular,
    /// A COMPUTE row for the given compute id.
    Compute(u16),
}

/// Outcome of advancing to the next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowStatus {
    /// A row is available.
    Row(RowKind),
    /// The current result is exhausted.
    NoMoreRows,
    /// The transport could not read the row.
    Failed,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_result_kind_from_u8() {
        assert_eq!(ResultKind::from_u8(0x81), Some(ResultKind::RowFormat));
        assert_eq!(ResultKind::from_u8(0xD2), Some(ResultKind::Row));
        assert_eq!(ResultKind::from_u8(0xFF), Some(ResultKind::DoneInProc));
        assert_eq!(ResultKind::from_u8(0xAA), None);
        assert!(ResultKind::try_from(0xAA).is_err());
    }

    #[test]
    fn test_result_kind_families() {
        assert!(ResultKind::DoneProc.is_done());
        assert!(!ResultKind::Row.is_done());
        assert!(ResultKind::ComputeFormat.is_format());
        assert!(ResultKind::Compute.is_row_bearing());
        assert!(!ResultKind::RowFormat.is_row_bearing());
    }

    #[test]
    fn test_done_status_bits() {
        let status = DoneStatus::from_bits_truncate(0x0013);
        assert!(status.contains(DoneStatus::MORE));
        assert!(status.contains(DoneStatus::COUNT));
        assert!(status.is_error());
        assert!(!DoneStatus::COUNT.is_error());
        assert!(DoneStatus::SRVERROR.is_error());
    }

    #[test]
    fn test_pulled_token_error_detection() {
        assert!(PulledToken::failed().is_error());
        assert!(PulledToken::done(ResultKind::Done, DoneStatus::ERROR).is_error());
        assert!(!PulledToken::done(ResultKind::Done, DoneStatus::COUNT).is_error());
        assert!(!PulledToken::token(ResultKind::Row).is_error());
        assert!(!PulledToken::no_more_results().is_error());
    }
}
