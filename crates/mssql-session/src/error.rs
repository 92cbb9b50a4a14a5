//! Session error types.

use std::fmt;

use thiserror::Error;

use crate::transport::TransportError;

/// A server diagnostic that reached the error threshold.
///
/// Carries the full diagnostic record that was retained for the failing
/// statement. Its display form mirrors the DB-Library one:
///
/// ```text
/// SQL Server message 208, severity 16, state 1, procedure p, line 3:
/// Invalid object name 'nope'.
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseError {
    /// Message number.
    pub number: i32,
    /// Severity (0-25).
    pub severity: i32,
    /// Message state.
    pub state: i32,
    /// Line in the batch or procedure.
    pub line: i32,
    /// Message text; never empty.
    pub message: String,
    /// Name of the server that raised the message.
    pub server: String,
    /// Procedure that raised the message, empty outside procedures.
    pub procedure: String,
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SQL Server message {}, severity {}, state {}, ",
            self.number, self.severity, self.state
        )?;
        if !self.procedure.is_empty() {
            write!(f, "procedure {}, ", self.procedure)?;
        }
        write!(f, "line {}:\n{}", self.line, self.message)
    }
}

impl std::error::Error for DatabaseError {}

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The session is closed or was never opened.
    #[error("not connected to any server")]
    NotConnected,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested protocol version is not in the supported table.
    #[error("unrecognized TDS version: {0}")]
    UnsupportedVersion(String),

    /// Opening the session failed.
    #[error("connection failed: {message}")]
    Connection {
        /// What failed.
        message: String,
        /// The diagnostic accumulated while connecting, if it reached the
        /// error threshold.
        diagnostic: Option<DatabaseError>,
    },

    /// A statement completed with an error status and no diagnostic
    /// explained it.
    #[error("could not complete statement")]
    StatementFailed,

    /// The result stream did not follow the token protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Type conversion, decoding or quoting error.
    #[error("type error: {0}")]
    Type(#[from] mssql_types::TypeError),

    /// The server raised a diagnostic at or above the error threshold.
    #[error("{0}")]
    Database(DatabaseError),
}

impl Error {
    /// Check if this error carries a server diagnostic.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Check if this error originated in the driver rather than the server.
    #[must_use]
    pub fn is_driver_error(&self) -> bool {
        !self.is_database_error()
    }

    /// Get the server diagnostic, if any.
    ///
    /// Connection failures expose the diagnostic they wrap.
    #[must_use]
    pub fn database_error(&self) -> Option<&DatabaseError> {
        match self {
            Self::Database(err) => Some(err),
            Self::Connection { diagnostic, .. } => diagnostic.as_ref(),
            _ => None,
        }
    }

    /// Get the severity of the server diagnostic, if any.
    #[must_use]
    pub fn severity(&self) -> Option<i32> {
        self.database_error().map(|err| err.severity)
    }

    /// Check if this is a server error with a specific number.
    #[must_use]
    pub fn is_server_error(&self, number: i32) -> bool {
        matches!(self, Self::Database(err) if err.number == number)
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Self::Database(err)
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
