//! # mssql-session
//!
//! Blocking, DB-Library style session for Sybase and SQL Server.
//!
//! A [`Session`] runs SQL batches over a [`Transport`] and reads their
//! results one row at a time. It owns the session state machine, the
//! severity-based diagnostics that turn server messages into errors, and the
//! substitution of client parameters into SQL text.
//!
//! ## Features
//!
//! - **Severity diagnostics**: the worst message of an operation is kept;
//!   severity 6 and above is raised as [`Error::Database`]
//! - **Process-wide fallback**: messages that arrive before a session exists
//!   (failed logins) land in a shared record, see [`last_message`]
//! - **Lazy cursors**: [`RowIter`] pulls rows on demand, including compute rows
//! - **Client-side parameters**: `%s`, `%d` and `%(name)s` placeholders are
//!   filled with quoted literals in the session charset
//!
//! ## Result Flow
//!
//! ```text
//! execute ─▶ cancel pending ─▶ substitute params ─▶ submit
//!         ─▶ locate result with columns ─▶ rows ... ─▶ next result ─▶ end
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_session::{Config, Params, Session};
//!
//! let config = Config::from_connection_string(
//!     "Server=syb1,5000;User Id=sa;Password=secret;Database=pubs;Charset=utf8"
//! )?;
//! let mut session = Session::open(&config, transport)?;
//!
//! session.execute_non_query(
//!     "insert into authors (name) values (%s)",
//!     Some(&Params::scalar("O'Brien")),
//! )?;
//!
//! if let Some(row) = session.execute_row("select 'test', 20", None)? {
//!     let label: String = row.get(0)?;
//!     let n: i32 = row.get(1)?;
//! }
//!
//! println!("last message: {:?}", session.last_message());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod cursor;
pub mod diagnostics;
pub mod error;
pub mod registry;
pub mod row;
pub mod session;
pub mod state;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, DEFAULT_SESSION_OPTIONS, Login};
pub use cursor::RowIter;
pub use diagnostics::{DiagnosticRecord, EXCOMM, LibraryError, MIN_ERROR_SEVERITY, ServerMessage};
pub use error::{DatabaseError, Error, Result};
pub use mssql_types::{ApiType, FromSql, Param, Params, SqlValue};
pub use registry::{DiagnosticSink, SessionId, last_message, reset_fallback};
pub use row::{Column, Row};
pub use session::{ExecuteOutcome, ExecuteResult, Session};
pub use state::{ExecuteMode, ResultState};
pub use tds_protocol::{RowKind, TdsVersion};
pub use transport::{ColumnData, Transport, TransportError};
