//! Server and library diagnostics.
//!
//! While a statement runs, the transport reports every message the server
//! sends and every error the library itself runs into. Each report lands in
//! a [`DiagnosticRecord`]: the one of the session it belongs to, or the
//! process-wide fallback when no live session can be matched (see
//! [`crate::registry`]).
//!
//! A record keeps only the worst report of a batch. A report overwrites the
//! stored one when its severity is at least the stored severity, so two
//! messages of severity 5 and 9 leave the severity-9 one behind regardless
//! of their order. After each transport call the session asks the record
//! for an error via [`DiagnosticRecord::take_error`]; only severities at or
//! above [`MIN_ERROR_SEVERITY`] are raised.

use crate::error::DatabaseError;

/// Lowest severity that fails an operation.
pub const MIN_ERROR_SEVERITY: i32 = 6;

/// Severity the library uses for communication errors.
pub const EXCOMM: i32 = 9;

/// A message sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerMessage {
    /// Message number.
    pub number: i32,
    /// Severity (0-25).
    pub severity: i32,
    /// Message state.
    pub state: i32,
    /// Line in the batch or procedure.
    pub line: i32,
    /// Message text.
    pub message: String,
    /// Name of the server that sent the message.
    pub server: String,
    /// Procedure that raised the message.
    pub procedure: String,
}

impl ServerMessage {
    /// Create a message with the given number, severity and text.
    pub fn new(number: i32, severity: i32, message: impl Into<String>) -> Self {
        Self {
            number,
            severity,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the message state.
    #[must_use]
    pub fn with_state(mut self, state: i32) -> Self {
        self.state = state;
        self
    }

    /// Set the line number.
    #[must_use]
    pub fn with_line(mut self, line: i32) -> Self {
        self.line = line;
        self
    }

    /// Set the originating server name.
    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Set the originating procedure name.
    #[must_use]
    pub fn with_procedure(mut self, procedure: impl Into<String>) -> Self {
        self.procedure = procedure.into();
        self
    }
}

/// An error raised by the client library rather than the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryError {
    /// Severity (see [`EXCOMM`]).
    pub severity: i32,
    /// Library error number.
    pub number: i32,
    /// Operating system error code, 0 when none.
    pub os_error: i32,
    /// Library error text.
    pub message: String,
    /// Operating system error text.
    pub os_message: String,
}

impl LibraryError {
    /// Create a library error without an operating system cause.
    pub fn new(number: i32, severity: i32, message: impl Into<String>) -> Self {
        Self {
            number,
            severity,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Attach the operating system error behind this one.
    #[must_use]
    pub fn with_os_error(mut self, code: i32, message: impl Into<String>) -> Self {
        self.os_error = code;
        self.os_message = message.into();
        self
    }
}

/// The retained diagnostic of a session or of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Message number.
    pub number: i32,
    /// Severity of the retained diagnostic; 0 when clear.
    pub severity: i32,
    /// Message state.
    pub state: i32,
    /// Line in the batch or procedure.
    pub line: i32,
    /// Message text.
    pub message: String,
    /// Server name.
    pub server: String,
    /// Procedure name.
    pub procedure: String,
}

impl DiagnosticRecord {
    /// Check if nothing has been recorded since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.severity == 0 && self.message.is_empty()
    }

    /// Record a server message if it is at least as severe as the stored
    /// one. Returns whether it was stored.
    pub fn offer(&mut self, msg: &ServerMessage) -> bool {
        if msg.severity < self.severity {
            return false;
        }
        self.number = msg.number;
        self.severity = msg.severity;
        self.state = msg.state;
        self.line = msg.line;
        self.message.clone_from(&msg.message);
        self.server.clone_from(&msg.server);
        self.procedure.clone_from(&msg.procedure);
        true
    }

    /// Record a library error.
    ///
    /// The error text is appended to the stored message so that a chain of
    /// library errors reads in order. An operating system cause replaces the
    /// text with a description of the failed call.
    pub fn absorb(&mut self, err: &LibraryError) {
        if err.severity >= self.severity {
            self.severity = err.severity;
            self.number = err.number;
            self.state = err.os_error;
        }

        if err.os_error != 0 {
            let kind = if err.severity == EXCOMM {
                "Net-Lib"
            } else {
                "Operating System"
            };
            self.message = format!("{kind} error during {}", err.os_message);
        } else {
            self.message.push_str(&format!(
                "DB-Lib error message {}, severity {}:\n{}\n",
                err.number, err.severity, err.message
            ));
        }
    }

    /// Reset to the empty record.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Take the retained diagnostic as an error if it reached `threshold`.
    ///
    /// Raising resets the record; a diagnostic below the threshold is left
    /// in place for the last-message accessors.
    pub fn take_error(&mut self, threshold: i32) -> Option<DatabaseError> {
        if self.severity < threshold {
            return None;
        }
        let record = std::mem::take(self);
        let message = if record.message.is_empty() {
            "Unknown error".to_string()
        } else {
            record.message
        };
        Some(DatabaseError {
            number: record.number,
            severity: record.severity,
            state: record.state,
            line: record.line,
            message,
            server: record.server,
            procedure: record.procedure,
        })
    }
}
