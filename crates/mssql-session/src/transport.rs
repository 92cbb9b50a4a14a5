//! The transport a session drives.
//!
//! A transport owns the connection and the TDS token framing. The session
//! never sees bytes on the wire; it submits SQL text, pulls classified
//! tokens, and reads column metadata and row data through this trait.
//!
//! All calls block. Diagnostics are not returned from these calls: the
//! transport delivers them to the [`DiagnosticSink`] it was given on open,
//! and the session inspects its record after each call.

use bytes::Bytes;
use chrono::NaiveDateTime;
use thiserror::Error;

use mssql_types::{CrackDateTime, TdsDateCracker, TypeError};
use tds_protocol::{PulledToken, RowKind, RowStatus, TokenFilter, TypeId};

use crate::config::Login;
use crate::registry::DiagnosticSink;

/// Transport failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The connection could not be established.
    #[error("unable to connect to {host}: {reason}")]
    Connect {
        /// Host specification that was tried.
        host: String,
        /// Why it failed.
        reason: String,
    },

    /// The connection is gone.
    #[error("connection is dead")]
    Dead,

    /// A column ordinal outside the current result.
    #[error("column {ordinal} out of range ({count} columns)")]
    ColumnOutOfRange {
        /// Requested 0-based ordinal.
        ordinal: usize,
        /// Columns in the current result.
        count: usize,
    },

    /// Any other transport-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Raw data of one column of the current row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnData {
    /// Wire type code of the column.
    pub type_code: u8,
    /// Declared data length.
    pub length: usize,
    /// Column bytes, `None` for NULL.
    pub data: Option<Bytes>,
}

impl ColumnData {
    /// Create column data from a wire type and its bytes.
    pub fn new(type_code: impl Into<u8>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            type_code: type_code.into(),
            length: data.len(),
            data: Some(data),
        }
    }

    /// Create a NULL column of the given wire type.
    pub fn null(type_code: impl Into<u8>) -> Self {
        Self {
            type_code: type_code.into(),
            length: 0,
            data: None,
        }
    }
}

/// A blocking TDS connection.
///
/// Column ordinals are 0-based.
pub trait Transport {
    /// Connect and log in.
    ///
    /// `sink` receives every diagnostic produced by this connection for its
    /// whole lifetime, including those sent during login.
    fn open(
        &mut self,
        login: &Login,
        host: &str,
        sink: DiagnosticSink,
    ) -> Result<(), TransportError>;

    /// Close the connection. Must tolerate being called on a closed
    /// connection.
    fn close(&mut self);

    /// Switch the current database.
    fn use_database(&mut self, name: &str) -> Result<(), TransportError>;

    /// Send a SQL batch.
    fn submit(&mut self, sql: &str) -> Result<(), TransportError>;

    /// Process tokens until the next one matching `filter`.
    fn pull_token(&mut self, filter: TokenFilter) -> Result<PulledToken, TransportError>;

    /// Ask the server to abandon pending results.
    fn send_cancel(&mut self) -> Result<(), TransportError>;

    /// Discard tokens up to the cancel acknowledgement.
    fn process_cancel(&mut self) -> Result<(), TransportError>;

    /// Rows affected by the last completed statement.
    fn rows_affected(&self) -> i64;

    /// Columns in the current result.
    fn column_count(&self) -> usize;

    /// Name of a column of the current result; may be empty.
    fn column_name(&self, ordinal: usize) -> Result<String, TransportError>;

    /// Wire type code of a column of the current result.
    fn column_type(&self, ordinal: usize) -> Result<u8, TransportError>;

    /// Declared precision and scale of a column of the current result.
    ///
    /// Only meaningful for numeric and decimal columns.
    fn column_precision_scale(&self, _ordinal: usize) -> Result<(u8, u8), TransportError> {
        Ok((0, 0))
    }

    /// Advance to the next row of the current result.
    fn next_row(&mut self) -> Result<RowStatus, TransportError>;

    /// Data of one column of the current row.
    fn column_data(&self, row: RowKind, ordinal: usize) -> Result<ColumnData, TransportError>;

    /// Turn raw date-time bytes into a calendar value.
    fn crack_datetime(&self, type_id: TypeId, data: &[u8]) -> Result<NaiveDateTime, TypeError> {
        TdsDateCracker.crack(type_id, data)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(
        &mut self,
        login: &Login,
        host: &str,
        sink: DiagnosticSink,
    ) -> Result<(), TransportError> {
        (**self).open(login, host, sink)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn use_database(&mut self, name: &str) -> Result<(), TransportError> {
        (**self).use_database(name)
    }

    fn submit(&mut self, sql: &str) -> Result<(), TransportError> {
        (**self).submit(sql)
    }

    fn pull_token(&mut self, filter: TokenFilter) -> Result<PulledToken, TransportError> {
        (**self).pull_token(filter)
    }

    fn send_cancel(&mut self) -> Result<(), TransportError> {
        (**self).send_cancel()
    }

    fn process_cancel(&mut self) -> Result<(), TransportError> {
        (**self).process_cancel()
    }

    fn rows_affected(&self) -> i64 {
        (**self).rows_affected()
    }

    fn column_count(&self) -> usize {
        (**self).column_count()
    }

    fn column_name(&self, ordinal: usize) -> Result<String, TransportError> {
        (**self).column_name(ordinal)
    }

    fn column_type(&self, ordinal: usize) -> Result<u8, TransportError> {
        (**self).column_type(ordinal)
    }

    fn column_precision_scale(&self, ordinal: usize) -> Result<(u8, u8), TransportError> {
        (**self).column_precision_scale(ordinal)
    }

    fn next_row(&mut self) -> Result<RowStatus, TransportError> {
        (**self).next_row()
    }

    fn column_data(&self, row: RowKind, ordinal: usize) -> Result<ColumnData, TransportError> {
        (**self).column_data(row, ordinal)
    }

    fn crack_datetime(&self, type_id: TypeId, data: &[u8]) -> Result<NaiveDateTime, TypeError> {
        (**self).crack_datetime(type_id, data)
    }
}

/// Adapter exposing a transport's date cracker to the value decoder.
pub(crate) struct TransportCracker<'a, T: Transport + ?Sized>(pub(crate) &'a T);

impl<T: Transport + ?Sized> CrackDateTime for TransportCracker<'_, T> {
    fn crack(&self, type_id: TypeId, data: &[u8]) -> Result<NaiveDateTime, TypeError> {
        self.0.crack_datetime(type_id, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tds_protocol::codes::{SYBINT4, SYBVARCHAR};

    #[test]
    fn test_column_data_constructors() {
        let col = ColumnData::new(SYBINT4, vec![1, 0, 0, 0]);
        assert_eq!(col.length, 4);
        assert_eq!(col.type_code, SYBINT4);

        let null = ColumnData::null(SYBVARCHAR);
        assert!(null.data.is_none());
        assert_eq!(null.length, 0);
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Connect {
            host: "db1:5000".into(),
            reason: "refused".into(),
        };
        assert_eq!(err.to_string(), "unable to connect to db1:5000: refused");
        assert_eq!(
            TransportError::ColumnOutOfRange { ordinal: 3, count: 2 }.to_string(),
            "column 3 out of range (2 columns)"
        );
    }
}
