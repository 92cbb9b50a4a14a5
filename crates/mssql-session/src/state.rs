//! Result state of a session.
//!
//! ## State Transitions
//!
//! ```text
//! Pending -> Rows       (a result with columns was located)
//! Pending -> Exhausted  (the response has no further results)
//! Rows -> Pending       (rows exhausted, metadata cleared)
//! Exhausted -> Pending  (metadata cleared after reporting the end)
//! any -> Pending        (cancel, new statement, close)
//! ```
//!
//! Locating a result from `Pending` pulls tokens from the transport and
//! skips results without columns, such as the completion of an `INSERT`
//! that precedes a `SELECT` in the same batch.

/// Where a session stands in the response to its last statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultState {
    /// No result has been located since metadata was last cleared.
    #[default]
    Pending,
    /// Positioned on a result with columns; rows can be read.
    Rows,
    /// The response holds no further results.
    Exhausted,
}

impl ResultState {
    /// Check if a result (or the end of the response) has been located.
    #[must_use]
    pub fn is_located(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Check if rows can be read.
    #[must_use]
    pub fn has_rows(&self) -> bool {
        matches!(self, Self::Rows)
    }
}

/// How [`Session::execute`](crate::Session::execute) treats the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecuteMode {
    /// Discard every result and report rows affected.
    NonQuery,
    /// Position on the first result with columns.
    Query,
    /// Read only the first row.
    Row,
    /// Read only the first column of the first row.
    Scalar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert_eq!(ResultState::default(), ResultState::Pending);
        assert!(!ResultState::Pending.is_located());
    }

    #[test]
    fn test_predicates() {
        assert!(ResultState::Rows.is_located());
        assert!(ResultState::Rows.has_rows());
        assert!(ResultState::Exhausted.is_located());
        assert!(!ResultState::Exhausted.has_rows());
    }
}
