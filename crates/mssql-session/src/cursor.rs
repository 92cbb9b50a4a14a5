//! Row cursor over the current result.

use std::iter::FusedIterator;

use crate::error::Result;
use crate::row::{Column, Row};
use crate::session::Session;
use crate::transport::Transport;

/// Lazy, forward-only iterator over the rows of a session's current result.
///
/// Each step clears residual diagnostics and fetches one row. Iteration
/// ends when the result runs out of rows; an error is yielded once and
/// also ends iteration. The cursor borrows its session mutably, so no other
/// statement can run while it is alive.
///
/// # Example
///
/// ```rust,ignore
/// for row in session.execute_query("select id, name from users", None)? {
///     let row = row?;
///     let id: i32 = row.get(0)?;
/// }
/// ```
pub struct RowIter<'a, T: Transport> {
    session: &'a mut Session<T>,
    finished: bool,
}

impl<'a, T: Transport> RowIter<'a, T> {
    pub(crate) fn new(session: &'a mut Session<T>) -> Self {
        Self {
            session,
            finished: false,
        }
    }

    /// Column descriptions of the current result.
    #[must_use]
    pub fn columns(&self) -> Option<&[Column]> {
        self.session.current_columns()
    }

    /// Check if the cursor has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Collect all remaining rows, stopping at the first error.
    pub fn collect_all(self) -> Result<Vec<Row>> {
        self.collect()
    }
}

impl<T: Transport> Iterator for RowIter<'_, T> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.session.cursor_step() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl<T: Transport> FusedIterator for RowIter<'_, T> {}

impl<T: Transport> std::fmt::Debug for RowIter<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowIter")
            .field("session", &self.session.id())
            .field("finished", &self.finished)
            .finish()
    }
}
