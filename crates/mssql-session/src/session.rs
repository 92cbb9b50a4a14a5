//! The session: lifecycle, statement execution and result retrieval.
//!
//! A [`Session`] drives one [`Transport`]. Every statement follows the same
//! path: cancel whatever is pending, render parameters into the SQL text,
//! submit it, and walk the response tokens until a result with rows, the
//! completion of a statement without columns, or the end of the response.
//!
//! After each transport call the session checks its diagnostic record. A
//! retained diagnostic of severity [`MIN_ERROR_SEVERITY`] or more abandons
//! pending results and is returned as [`Error::Database`]; anything less
//! severe is left for [`Session::last_message`].

use std::borrow::Cow;
use std::sync::Arc;

use encoding_rs::Encoding;
use mssql_types::charset::{DEFAULT_CHARSET, optional_encoding};
use mssql_types::{DecodeContext, Params, SqlValue, decode_column, substitute};
use tds_protocol::{ResultKind, RowKind, RowStatus, TokenFilter, TokenStatus};

use crate::config::Config;
use crate::cursor::RowIter;
use crate::diagnostics::{DiagnosticRecord, MIN_ERROR_SEVERITY};
use crate::error::{DatabaseError, Error, Result};
use crate::registry::{self, DiagnosticSink, SessionId};
use crate::row::{Column, Row};
use crate::state::{ExecuteMode, ResultState};
use crate::transport::{Transport, TransportCracker, TransportError};

/// Result of a statement run for its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Rows affected by the last statement of the batch, as reported by the
    /// server; -1 when the server did not report a count.
    pub rows_affected: i64,
}

impl ExecuteResult {
    /// Create a new execute result.
    pub fn new(rows_affected: i64) -> Self {
        Self { rows_affected }
    }
}

/// What [`Session::execute`] produced, by [`ExecuteMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    /// Results were discarded.
    NonQuery(ExecuteResult),
    /// The session is positioned on the first result with columns.
    Query,
    /// The first row, if any.
    Row(Option<Row>),
    /// The first column of the first row, if any.
    Scalar(Option<SqlValue>),
}

// How a token pull concluded.
enum Conclusion {
    Result,
    Exhausted,
}

/// A blocking session with one server.
///
/// Sessions are opened with [`Session::open`] and closed with
/// [`Session::close`]; dropping an open session closes it.
///
/// # Example
///
/// ```rust,ignore
/// use mssql_session::{Config, Session};
/// use mssql_types::Params;
///
/// let config = Config::from_connection_string("Server=syb1;User Id=sa;Password=x;Charset=utf8")?;
/// let mut session = Session::open(&config, transport)?;
///
/// let count = session.execute_scalar("select count(*) from users where city = %s",
///     Some(&Params::scalar("Nowhere")))?;
///
/// for row in session.execute_query("select id, name from users", None)? {
///     let row = row?;
///     println!("{}: {}", row.get::<i32>(0)?, row.get::<String>(1)?);
/// }
///
/// session.close();
/// ```
pub struct Session<T: Transport> {
    transport: T,
    id: SessionId,
    connected: bool,
    server: String,
    database: Option<String>,
    charset: Option<String>,
    encoding: Option<&'static Encoding>,
    columns: Option<Arc<[Column]>>,
    state: ResultState,
    rows_affected: i64,
}

impl<T: Transport> Session<T> {
    /// Open a session over `transport`.
    ///
    /// The configuration is validated before anything is sent. Diagnostics
    /// produced during login go to the process-wide fallback record; if the
    /// login fails, or completes with a diagnostic of severity 6 or more, the
    /// worst of them is attached to the returned [`Error::Connection`]. When
    /// [`Config::init_sql`] is set it runs right after login, and a failure
    /// there closes the session again.
    pub fn open(config: &Config, mut transport: T) -> Result<Self> {
        let login = config.login()?;
        let encoding = optional_encoding(config.charset.as_deref())?;
        let host = config.host_spec();

        tracing::info!(
            host = %host,
            user = %login.user,
            tds_version = %login.tds_version,
            "opening session"
        );

        let id = registry::reserve();
        if let Err(err) = transport.open(&login, &host, DiagnosticSink::for_session(id)) {
            registry::release(id);
            let diagnostic = registry::with_record(None, |r| r.take_error(MIN_ERROR_SEVERITY));
            tracing::warn!(host = %host, error = %err, "connection failed");
            return Err(Error::Connection {
                message: err.to_string(),
                diagnostic,
            });
        }

        // A login can complete while the server still reports an error,
        // e.g. an unusable default database.
        let login_error = registry::with_record(None, |r| r.take_error(MIN_ERROR_SEVERITY));
        if let Some(diagnostic) = login_error {
            transport.close();
            registry::release(id);
            tracing::warn!(
                host = %host,
                number = diagnostic.number,
                severity = diagnostic.severity,
                "login reported a server error"
            );
            return Err(Error::Connection {
                message: format!("login reported server error {}", diagnostic.number),
                diagnostic: Some(diagnostic),
            });
        }
        registry::activate(id);

        let mut session = Self {
            transport,
            id,
            connected: true,
            server: host,
            database: login.database.clone(),
            charset: login.charset.clone(),
            encoding,
            columns: None,
            state: ResultState::Pending,
            rows_affected: -1,
        };
        tracing::info!(session = %id, host = %session.server, "session opened");

        if let Some(sql) = config.init_sql.as_deref() {
            if let Err(err) = session.execute_non_query(sql, None) {
                let diagnostic = err.database_error().cloned();
                session.close();
                return Err(Error::Connection {
                    message: format!("could not set session options: {err}"),
                    diagnostic,
                });
            }
            session.clear_error();
        }

        Ok(session)
    }

    /// Close the session.
    ///
    /// Releases the transport and unregisters the session. Closing a closed
    /// session does nothing.
    pub fn close(&mut self) {
        if !self.connected {
            return;
        }
        self.clear_error();
        self.transport.close();
        registry::release(self.id);
        self.connected = false;
        self.clear_metadata();
        tracing::info!(session = %self.id, "session closed");
    }

    /// Cancel all pending results of the last statement.
    ///
    /// Safe to call with nothing pending and any number of times.
    pub fn cancel(&mut self) -> Result<()> {
        self.assert_connected()?;
        self.clear_error();
        let cancelled = self.cancel_pending();
        self.checked(cancelled)
    }

    /// Switch the current database.
    pub fn select_db(&mut self, name: &str) -> Result<()> {
        self.assert_connected()?;
        self.clear_error();
        tracing::debug!(session = %self.id, database = name, "selecting database");
        let switched = self.transport.use_database(name);
        self.checked(switched)?;
        self.database = Some(name.to_string());
        Ok(())
    }

    // ========================================================================
    // Statement Execution
    // ========================================================================

    /// Run a statement and treat its response according to `mode`.
    ///
    /// Pending results of the previous statement are discarded first. When
    /// `params` is present and not empty, its values are rendered as
    /// literals into `sql` (see [`mssql_types::quote::substitute`]); without
    /// parameters `sql` is sent unchanged.
    pub fn execute(
        &mut self,
        sql: &str,
        params: Option<&Params>,
        mode: ExecuteMode,
    ) -> Result<ExecuteOutcome> {
        self.run(sql, params)?;
        match mode {
            ExecuteMode::NonQuery => self.drain().map(ExecuteOutcome::NonQuery),
            ExecuteMode::Query => {
                self.locate()?;
                Ok(ExecuteOutcome::Query)
            }
            ExecuteMode::Row => self.fetch_row().map(ExecuteOutcome::Row),
            ExecuteMode::Scalar => self.fetch_row().map(|row| {
                ExecuteOutcome::Scalar(row.and_then(|r| r.into_values().into_iter().next()))
            }),
        }
    }

    /// Run a statement for its side effects and discard every result.
    pub fn execute_non_query(
        &mut self,
        sql: &str,
        params: Option<&Params>,
    ) -> Result<ExecuteResult> {
        self.run(sql, params)?;
        self.drain()
    }

    /// Run a statement and iterate over the rows of its first result with
    /// columns.
    ///
    /// [`Session::rows_affected`] is meaningful only after every row has
    /// been read.
    pub fn execute_query(&mut self, sql: &str, params: Option<&Params>) -> Result<RowIter<'_, T>> {
        self.run(sql, params)?;
        self.locate()?;
        Ok(RowIter::new(self))
    }

    /// Run a statement and return its first row.
    ///
    /// Remaining rows can still be read with [`Session::rows`].
    pub fn execute_row(&mut self, sql: &str, params: Option<&Params>) -> Result<Option<Row>> {
        self.run(sql, params)?;
        self.fetch_row()
    }

    /// Run a statement and return the first column of its first row.
    ///
    /// Remaining rows can still be read with [`Session::rows`].
    pub fn execute_scalar(
        &mut self,
        sql: &str,
        params: Option<&Params>,
    ) -> Result<Option<SqlValue>> {
        self.run(sql, params)?;
        Ok(self
            .fetch_row()?
            .and_then(|row| row.into_values().into_iter().next()))
    }

    // ========================================================================
    // Result Retrieval
    // ========================================================================

    /// Read the next row of the current result.
    ///
    /// Returns `None` once the result has no more rows; rows affected are
    /// then refreshed from the transport and the result metadata is
    /// cleared, so the next call moves on to the next result.
    pub fn fetch_row(&mut self) -> Result<Option<Row>> {
        self.assert_connected()?;
        self.locate()?;

        if self.state == ResultState::Exhausted {
            tracing::debug!(session = %self.id, "no more results");
            self.clear_metadata();
            return Ok(None);
        }

        let advanced = self.transport.next_row();
        match self.checked(advanced)? {
            RowStatus::Row(kind) => self.read_row(kind).map(Some),
            RowStatus::NoMoreRows => {
                tracing::debug!(session = %self.id, "no more rows");
                self.clear_metadata();
                self.rows_affected = self.transport.rows_affected();
                Ok(None)
            }
            RowStatus::Failed => Err(self.statement_failed()),
        }
    }

    /// Column descriptions of the current result.
    ///
    /// Returns `None` when the current result has no columns or the
    /// response is exhausted.
    pub fn column_header(&mut self) -> Result<Option<Arc<[Column]>>> {
        self.assert_connected()?;
        self.locate()?;
        Ok(self.columns.clone().filter(|columns| !columns.is_empty()))
    }

    /// Iterate over the rows of the current result, or of the next one once
    /// the current result has been read to the end.
    pub fn rows(&mut self) -> Result<RowIter<'_, T>> {
        self.assert_connected()?;
        self.clear_error();
        Ok(RowIter::new(self))
    }

    /// Skip the rest of the current result and move to the next result with
    /// columns. Returns whether there is one.
    pub fn next_result(&mut self) -> Result<bool> {
        self.assert_connected()?;
        self.clear_error();

        while self.state == ResultState::Rows {
            let advanced = self.transport.next_row();
            match self.checked(advanced)? {
                RowStatus::Row(_) => {}
                RowStatus::NoMoreRows => {
                    self.clear_metadata();
                    self.rows_affected = self.transport.rows_affected();
                }
                RowStatus::Failed => return Err(self.statement_failed()),
            }
        }
        if self.state == ResultState::Exhausted {
            self.clear_metadata();
        }

        self.locate()?;
        Ok(self.state.has_rows())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Check if the session is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Rows affected by the last statement.
    ///
    /// For queries the count is only meaningful after every row has been
    /// read.
    #[must_use]
    pub fn rows_affected(&self) -> i64 {
        self.rows_affected
    }

    /// The configured client charset.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// The host specification the session connected to.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// The database selected at login or by [`Session::select_db`].
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// The registry id of this session.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Copy of this session's diagnostic record.
    ///
    /// Holds the worst diagnostic since the last operation started, including
    /// informational ones that did not raise. Once the session is closed this
    /// reports the process-wide fallback record.
    #[must_use]
    pub fn last_message(&self) -> DiagnosticRecord {
        registry::with_record(Some(self.id), |record| record.clone())
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn current_columns(&self) -> Option<&[Column]> {
        self.columns.as_deref()
    }

    pub(crate) fn cursor_step(&mut self) -> Result<Option<Row>> {
        self.assert_connected()?;
        self.clear_error();
        self.fetch_row()
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn assert_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn run(&mut self, sql: &str, params: Option<&Params>) -> Result<()> {
        self.cancel()?;

        let sql = match params {
            Some(params) if !params.is_empty() => {
                let charset = self.charset.as_deref().unwrap_or(DEFAULT_CHARSET);
                Cow::Owned(substitute(sql, params, charset)?)
            }
            _ => Cow::Borrowed(sql),
        };

        tracing::debug!(session = %self.id, sql = %sql, "submitting statement");
        let submitted = self.transport.submit(&sql);
        self.checked(submitted)
    }

    /// Pull tokens until something conclusive: a row, a completion, or the
    /// end of the response.
    fn pull_result(&mut self) -> Result<Conclusion> {
        let mut in_result = false;
        loop {
            let pulled = self.transport.pull_token(TokenFilter::Results);
            let token = self.checked(pulled)?;
            if token.is_error() {
                return Err(self.statement_failed());
            }

            if token.status == TokenStatus::NoMoreResults {
                if in_result {
                    return Err(Error::Protocol(
                        "response ended inside a result set".to_string(),
                    ));
                }
                return Ok(Conclusion::Exhausted);
            }

            let Some(kind) = token.kind else {
                return Err(Error::Protocol("token without a result kind".to_string()));
            };

            match kind {
                ResultKind::RowFormat | ResultKind::ComputeFormat => in_result = true,
                ResultKind::DoneInProc => in_result = false,
                ResultKind::Row | ResultKind::Compute | ResultKind::Done | ResultKind::DoneProc => {
                    self.rows_affected = self.transport.rows_affected();
                    tracing::debug!(
                        session = %self.id,
                        kind = ?kind,
                        rows_affected = self.rows_affected,
                        "result located"
                    );
                    return Ok(Conclusion::Result);
                }
            }
        }
    }

    /// Position on the next result with columns, unless already positioned.
    fn locate(&mut self) -> Result<()> {
        if self.state.is_located() {
            return Ok(());
        }
        self.clear_metadata();

        loop {
            match self.pull_result()? {
                Conclusion::Exhausted => {
                    self.state = ResultState::Exhausted;
                    break;
                }
                Conclusion::Result => {
                    let count = self.transport.column_count();
                    if count > 0 {
                        self.load_columns(count)?;
                        self.state = ResultState::Rows;
                        break;
                    }
                }
            }
        }

        self.check_diagnostics()
    }

    /// Walk the response up to its first result with columns or its end,
    /// then abandon the rest.
    fn drain(&mut self) -> Result<ExecuteResult> {
        self.clear_metadata();
        loop {
            match self.pull_result()? {
                Conclusion::Exhausted => break,
                Conclusion::Result if self.transport.column_count() > 0 => break,
                Conclusion::Result => {}
            }
        }

        let cancelled = self.cancel_pending();
        self.checked(cancelled)?;
        tracing::debug!(
            session = %self.id,
            rows_affected = self.rows_affected,
            "statement completed"
        );
        Ok(ExecuteResult::new(self.rows_affected))
    }

    fn load_columns(&mut self, count: usize) -> Result<()> {
        let transport = &self.transport;
        let columns = (0..count)
            .map(|ordinal| {
                let name = transport.column_name(ordinal)?;
                let type_code = transport.column_type(ordinal)?;
                let (precision, scale) = transport.column_precision_scale(ordinal)?;
                Ok(Column::new(name, ordinal, type_code).with_precision_scale(precision, scale))
            })
            .collect::<Result<Arc<[Column]>>>()?;

        tracing::debug!(session = %self.id, columns = columns.len(), "result metadata");
        self.columns = Some(columns);
        Ok(())
    }

    fn read_row(&self, kind: RowKind) -> Result<Row> {
        let columns = self
            .columns
            .clone()
            .ok_or_else(|| Error::Protocol("row without result metadata".to_string()))?;
        let cracker = TransportCracker(&self.transport);

        let values = columns
            .iter()
            .map(|column| {
                let data = self.transport.column_data(kind, column.ordinal)?;
                let ctx = DecodeContext::new(&cracker)
                    .with_encoding(self.encoding)
                    .with_precision_scale(column.precision, column.scale);
                Ok(decode_column(
                    data.type_code,
                    data.length,
                    data.data.as_deref(),
                    &ctx,
                )?)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Row::new(columns, values).with_kind(kind))
    }

    fn cancel_pending(&mut self) -> std::result::Result<(), TransportError> {
        let result = self
            .transport
            .send_cancel()
            .and_then(|()| self.transport.process_cancel());
        self.clear_metadata();
        result
    }

    /// Abandon pending results after an error; a failing cancel is logged
    /// so the original error is the one reported.
    fn abandon(&mut self) {
        if let Err(err) = self.cancel_pending() {
            tracing::warn!(session = %self.id, error = %err, "cancel failed");
        }
    }

    fn checked<R>(&mut self, result: std::result::Result<R, TransportError>) -> Result<R> {
        self.check_diagnostics()?;
        Ok(result?)
    }

    fn check_diagnostics(&mut self) -> Result<()> {
        match self.take_error() {
            None => Ok(()),
            Some(err) => {
                self.abandon();
                self.clear_error();
                Err(self.raise(err))
            }
        }
    }

    fn statement_failed(&mut self) -> Error {
        self.abandon();
        match self.take_error() {
            Some(err) => {
                self.clear_error();
                self.raise(err)
            }
            None => {
                tracing::warn!(session = %self.id, "statement failed without a diagnostic");
                Error::StatementFailed
            }
        }
    }

    fn raise(&self, err: DatabaseError) -> Error {
        tracing::warn!(
            session = %self.id,
            number = err.number,
            severity = err.severity,
            state = err.state,
            line = err.line,
            message = %err.message,
            "server error"
        );
        Error::Database(err)
    }

    fn take_error(&self) -> Option<DatabaseError> {
        registry::with_record(Some(self.id), |record| record.take_error(MIN_ERROR_SEVERITY))
    }

    fn clear_error(&self) {
        registry::with_record(Some(self.id), DiagnosticRecord::clear);
    }

    fn clear_metadata(&mut self) {
        self.columns = None;
        self.state = ResultState::Pending;
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("connected", &self.connected)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("state", &self.state)
            .field("rows_affected", &self.rows_affected)
            .finish_non_exhaustive()
    }
}
