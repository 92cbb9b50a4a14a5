//! Scripted transport for unit testing.
//!
//! [`MockTransport`] implements [`Transport`] without a server. Responses are
//! keyed by the exact SQL text a session submits; each response lists the
//! results it produces and the diagnostics delivered when it is submitted.
//!
//! ## Features
//!
//! - Result sequences with and without columns, including compute rows
//! - Server messages and library errors on login, submit and database switch
//! - Login failures and dead connections
//! - A shared [`MockLog`] of submitted SQL, cancels and close calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_testing::mock_transport::{MockColumn, MockResponse, MockTransport, ScalarValue};
//!
//! let transport = MockTransport::builder()
//!     .with_response(
//!         "select 'test', 20",
//!         MockResponse::rows(
//!             vec![MockColumn::varchar(""), MockColumn::int("")],
//!             vec![vec![ScalarValue::Text("test".into()), ScalarValue::Int(20)]],
//!         ),
//!     )
//!     .build();
//! let log = transport.log();
//!
//! let mut session = Session::open(&config, transport)?;
//! let row = session.execute_row("select 'test', 20", None)?;
//! assert_eq!(log.submitted(), vec!["select 'test', 20"]);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use mssql_session::{
    ColumnData, DiagnosticSink, LibraryError, Login, ServerMessage, Transport, TransportError,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tds_protocol::codes::*;
use tds_protocol::{DoneStatus, PulledToken, ResultKind, RowKind, RowStatus, TokenFilter};

/// Value of one mock column.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// NULL value.
    Null,
    /// BIT.
    Bool(bool),
    /// TINYINT.
    TinyInt(i8),
    /// SMALLINT.
    SmallInt(i16),
    /// INT.
    Int(i32),
    /// BIGINT.
    BigInt(i64),
    /// REAL.
    Real(f32),
    /// FLOAT.
    Double(f64),
    /// MONEY, sent as high word then low word.
    Money(Decimal),
    /// DATETIME.
    DateTime(NaiveDateTime),
    /// Character data, sent as UTF-8.
    Text(String),
    /// Byte data.
    Binary(Vec<u8>),
}

impl ScalarValue {
    /// Encode this value the way a server sends it.
    fn encode(&self) -> Option<Bytes> {
        let mut dst = BytesMut::new();
        match self {
            Self::Null => return None,
            Self::Bool(v) => dst.put_u8(u8::from(*v)),
            Self::TinyInt(v) => dst.put_i8(*v),
            Self::SmallInt(v) => dst.put_i16_le(*v),
            Self::Int(v) => dst.put_i32_le(*v),
            Self::BigInt(v) => dst.put_i64_le(*v),
            Self::Real(v) => dst.put_f32_le(*v),
            Self::Double(v) => dst.put_f64_le(*v),
            Self::Money(v) => {
                let mut scaled = *v;
                scaled.rescale(4);
                let units = i64::try_from(scaled.mantissa()).unwrap_or_default();
                dst.put_i32_le((units >> 32) as i32);
                dst.put_u32_le(units as u32);
            }
            Self::DateTime(v) => {
                let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
                let days = (v.date() - epoch).num_days();
                let millis = u64::from(v.num_seconds_from_midnight()) * 1000
                    + u64::from(v.nanosecond() / 1_000_000);
                dst.put_i32_le(i32::try_from(days).unwrap_or_default());
                dst.put_u32_le(u32::try_from(millis * 300 / 1000).unwrap_or_default());
            }
            Self::Text(s) => dst.extend_from_slice(s.as_bytes()),
            Self::Binary(data) => dst.extend_from_slice(data),
        }
        Some(dst.freeze())
    }
}

/// Mock column definition.
#[derive(Debug, Clone)]
pub struct MockColumn {
    /// Column name; empty for unnamed expressions.
    pub name: String,
    /// Wire type code.
    pub type_code: u8,
    /// Declared precision.
    pub precision: u8,
    /// Declared scale.
    pub scale: u8,
}

impl MockColumn {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, type_code: u8) -> Self {
        Self {
            name: name.into(),
            type_code,
            precision: 0,
            scale: 0,
        }
    }

    /// Create an INT column.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, SYBINT4)
    }

    /// Create a TINYINT column.
    pub fn tinyint(name: impl Into<String>) -> Self {
        Self::new(name, SYBINT1)
    }

    /// Create a BIGINT column.
    pub fn bigint(name: impl Into<String>) -> Self {
        Self::new(name, SYBINT8)
    }

    /// Create a VARCHAR column.
    pub fn varchar(name: impl Into<String>) -> Self {
        Self::new(name, SYBVARCHAR)
    }

    /// Create a MONEY column.
    pub fn money(name: impl Into<String>) -> Self {
        Self::new(name, SYBMONEY)
    }

    /// Create a DATETIME column.
    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, SYBDATETIME)
    }

    /// Set precision and scale.
    #[must_use]
    pub fn with_precision_scale(mut self, precision: u8, scale: u8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }
}

/// One mock row.
#[derive(Debug, Clone)]
pub struct MockRow {
    kind: RowKind,
    values: Vec<ScalarValue>,
}

impl MockRow {
    /// A regular row.
    pub fn new(values: Vec<ScalarValue>) -> Self {
        Self {
            kind: RowKind::Regular,
            values,
        }
    }

    /// A compute row for compute id `id`.
    pub fn compute(id: u16, values: Vec<ScalarValue>) -> Self {
        Self {
            kind: RowKind::Compute(id),
            values,
        }
    }
}

impl From<Vec<ScalarValue>> for MockRow {
    fn from(values: Vec<ScalarValue>) -> Self {
        Self::new(values)
    }
}

/// One result of a response.
#[derive(Debug, Clone)]
pub struct MockResult {
    columns: Vec<MockColumn>,
    rows: Vec<MockRow>,
    rows_affected: i64,
    in_proc: bool,
    failed: bool,
}

impl MockResult {
    /// A result with columns and rows. Rows affected is the row count.
    pub fn rows<R: Into<MockRow>>(columns: Vec<MockColumn>, rows: Vec<R>) -> Self {
        let rows: Vec<MockRow> = rows.into_iter().map(Into::into).collect();
        Self {
            columns,
            rows_affected: i64::try_from(rows.len()).unwrap_or(i64::MAX),
            rows,
            in_proc: false,
            failed: false,
        }
    }

    /// A completion without columns reporting `count` affected rows.
    pub fn affected(count: i64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: count,
            in_proc: false,
            failed: false,
        }
    }

    /// A completion without columns and without a row count.
    pub fn done() -> Self {
        Self::affected(-1)
    }

    /// Report completion as DONEINPROC.
    #[must_use]
    pub fn in_proc(mut self) -> Self {
        self.in_proc = true;
        self
    }

    /// Flag the completion with an error.
    #[must_use]
    pub fn failed(mut self) -> Self {
        self.failed = true;
        self
    }
}

/// Scripted response to one SQL text.
#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    results: Vec<MockResult>,
    messages: Vec<ServerMessage>,
    library_errors: Vec<LibraryError>,
    submit_error: Option<TransportError>,
}

impl MockResponse {
    /// A single completion without a row count.
    pub fn empty() -> Self {
        Self::results(vec![MockResult::done()])
    }

    /// A single completion reporting `count` affected rows.
    pub fn affected(count: i64) -> Self {
        Self::results(vec![MockResult::affected(count)])
    }

    /// A single result with rows.
    pub fn rows<R: Into<MockRow>>(columns: Vec<MockColumn>, rows: Vec<R>) -> Self {
        Self::results(vec![MockResult::rows(columns, rows)])
    }

    /// A single row with a single column.
    pub fn scalar(column: MockColumn, value: ScalarValue) -> Self {
        Self::rows(vec![column], vec![vec![value]])
    }

    /// A sequence of results.
    pub fn results(results: Vec<MockResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    /// A severity 16 server error followed by a failed completion.
    pub fn error(number: i32, message: impl Into<String>) -> Self {
        Self::results(vec![MockResult::done().failed()])
            .with_message(ServerMessage::new(number, 16, message).with_state(1).with_line(1))
    }

    /// A submit that fails in the transport.
    pub fn broken(err: TransportError) -> Self {
        Self {
            submit_error: Some(err),
            ..Self::default()
        }
    }

    /// Append a result.
    #[must_use]
    pub fn then(mut self, result: MockResult) -> Self {
        self.results.push(result);
        self
    }

    /// Deliver a server message on submit.
    #[must_use]
    pub fn with_message(mut self, msg: ServerMessage) -> Self {
        self.messages.push(msg);
        self
    }

    /// Deliver a library error on submit.
    #[must_use]
    pub fn with_library_error(mut self, err: LibraryError) -> Self {
        self.library_errors.push(err);
        self
    }

    fn deliver(&self, sink: Option<DiagnosticSink>) {
        let Some(sink) = sink else {
            return;
        };
        for msg in &self.messages {
            sink.server_message(msg);
        }
        for err in &self.library_errors {
            sink.library_error(err);
        }
    }
}

/// What a mock transport was asked to do.
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    /// Host specification passed to open.
    pub host: Option<String>,
    /// User name of the login.
    pub user: Option<String>,
    /// SQL texts in submission order.
    pub submitted: Vec<String>,
    /// Databases switched to.
    pub databases: Vec<String>,
    /// Number of cancel requests.
    pub cancels: usize,
    /// Whether close was called.
    pub closed: bool,
}

/// Shared view of a [`MockLog`] that outlives the transport.
#[derive(Debug, Clone, Default)]
pub struct MockLogHandle(Arc<Mutex<MockLog>>);

impl MockLogHandle {
    /// Copy of the log.
    #[must_use]
    pub fn snapshot(&self) -> MockLog {
        self.0.lock().clone()
    }

    /// SQL texts in submission order.
    #[must_use]
    pub fn submitted(&self) -> Vec<String> {
        self.0.lock().submitted.clone()
    }

    /// Number of cancel requests.
    #[must_use]
    pub fn cancels(&self) -> usize {
        self.0.lock().cancels
    }

    /// Whether close was called.
    #[must_use]
    pub fn closed(&self) -> bool {
        self.0.lock().closed
    }

    fn update(&self, f: impl FnOnce(&mut MockLog)) {
        f(&mut self.0.lock());
    }
}

/// Configuration for a [`MockTransport`].
#[derive(Debug, Clone, Default)]
struct MockConfig {
    responses: HashMap<String, MockResponse>,
    default_response: Option<MockResponse>,
    login_response: MockResponse,
    login_failure: Option<String>,
    database_errors: HashMap<String, MockResponse>,
}

/// Builder for [`MockTransport`].
#[derive(Debug, Default)]
pub struct MockTransportBuilder {
    config: MockConfig,
}

impl MockTransportBuilder {
    /// Create a new builder. Unmatched SQL gets [`MockResponse::empty`].
    pub fn new() -> Self {
        Self {
            config: MockConfig {
                default_response: Some(MockResponse::empty()),
                ..MockConfig::default()
            },
        }
    }

    /// Add a response for a specific SQL text.
    #[must_use]
    pub fn with_response(mut self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.config.responses.insert(sql.into(), response);
        self
    }

    /// Set the response for unmatched SQL. `None` makes unmatched SQL fail
    /// with a server error.
    #[must_use]
    pub fn with_default_response(mut self, response: Option<MockResponse>) -> Self {
        self.config.default_response = response;
        self
    }

    /// Deliver a server message during login.
    #[must_use]
    pub fn with_login_message(mut self, msg: ServerMessage) -> Self {
        self.config.login_response = self.config.login_response.with_message(msg);
        self
    }

    /// Deliver a library error during login.
    #[must_use]
    pub fn with_login_library_error(mut self, err: LibraryError) -> Self {
        self.config.login_response = self.config.login_response.with_library_error(err);
        self
    }

    /// Make login fail after its diagnostics are delivered.
    #[must_use]
    pub fn with_login_failure(mut self, reason: impl Into<String>) -> Self {
        self.config.login_failure = Some(reason.into());
        self
    }

    /// Make switching to `database` fail with a severity 16 server error.
    #[must_use]
    pub fn with_database_error(
        mut self,
        database: impl Into<String>,
        number: i32,
        message: impl Into<String>,
    ) -> Self {
        self.config
            .database_errors
            .insert(database.into(), MockResponse::error(number, message));
        self
    }

    /// Build the transport.
    pub fn build(self) -> MockTransport {
        MockTransport {
            config: self.config,
            log: MockLogHandle::default(),
            sink: None,
            dead: false,
            pending: VecDeque::new(),
            current: None,
            rows_affected: -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Format,
    Rows,
    Done,
    Finished,
}

#[derive(Debug)]
struct Current {
    result: MockResult,
    phase: Phase,
    next_row: usize,
    row: Option<usize>,
}

/// A scripted, in-memory transport.
#[derive(Debug)]
pub struct MockTransport {
    config: MockConfig,
    log: MockLogHandle,
    sink: Option<DiagnosticSink>,
    dead: bool,
    pending: VecDeque<MockResult>,
    current: Option<Current>,
    rows_affected: i64,
}

impl MockTransport {
    /// Create a new builder.
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::new()
    }

    /// Handle on the log of this transport.
    #[must_use]
    pub fn log(&self) -> MockLogHandle {
        self.log.clone()
    }

    /// Mark the connection dead; every later call fails.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    fn alive(&self) -> Result<(), TransportError> {
        if self.dead {
            Err(TransportError::Dead)
        } else {
            Ok(())
        }
    }

    fn response_for(&self, sql: &str) -> MockResponse {
        self.config
            .responses
            .get(sql)
            .or(self.config.default_response.as_ref())
            .cloned()
            .unwrap_or_else(|| MockResponse::error(2812, format!("no mock response for: {sql}")))
    }

    fn columns(&self) -> &[MockColumn] {
        self.current
            .as_ref()
            .map_or(&[], |c| c.result.columns.as_slice())
    }

    fn column(&self, ordinal: usize) -> Result<&MockColumn, TransportError> {
        let columns = self.columns();
        columns.get(ordinal).ok_or(TransportError::ColumnOutOfRange {
            ordinal,
            count: columns.len(),
        })
    }
}

impl Transport for MockTransport {
    fn open(
        &mut self,
        login: &Login,
        host: &str,
        sink: DiagnosticSink,
    ) -> Result<(), TransportError> {
        self.log.update(|log| {
            log.host = Some(host.to_string());
            log.user = Some(login.user.clone());
        });
        self.config.login_response.deliver(Some(sink));

        if let Some(reason) = &self.config.login_failure {
            return Err(TransportError::Connect {
                host: host.to_string(),
                reason: reason.clone(),
            });
        }
        self.alive()?;
        self.sink = Some(sink);
        Ok(())
    }

    fn close(&mut self) {
        self.log.update(|log| log.closed = true);
        self.sink = None;
        self.pending.clear();
        self.current = None;
    }

    fn use_database(&mut self, name: &str) -> Result<(), TransportError> {
        self.alive()?;
        if let Some(response) = self.config.database_errors.get(name) {
            response.deliver(self.sink);
            return Err(TransportError::Other(format!("cannot use database {name}")));
        }
        self.log.update(|log| log.databases.push(name.to_string()));
        Ok(())
    }

    fn submit(&mut self, sql: &str) -> Result<(), TransportError> {
        self.alive()?;
        self.log.update(|log| log.submitted.push(sql.to_string()));
        tracing::debug!(sql, "mock submit");

        let response = self.response_for(sql);
        response.deliver(self.sink);
        if let Some(err) = response.submit_error {
            return Err(err);
        }

        self.pending = response.results.into();
        self.current = None;
        self.rows_affected = -1;
        Ok(())
    }

    fn pull_token(&mut self, _filter: TokenFilter) -> Result<PulledToken, TransportError> {
        self.alive()?;
        loop {
            if self.current.as_ref().is_none_or(|c| c.phase == Phase::Finished) {
                let Some(result) = self.pending.pop_front() else {
                    self.current = None;
                    return Ok(PulledToken::no_more_results());
                };
                let phase = if result.columns.is_empty() {
                    Phase::Done
                } else {
                    Phase::Format
                };
                self.current = Some(Current {
                    result,
                    phase,
                    next_row: 0,
                    row: None,
                });
            }

            let Some(current) = self.current.as_mut() else {
                continue;
            };
            match current.phase {
                Phase::Format => {
                    current.phase = Phase::Rows;
                    return Ok(PulledToken::token(ResultKind::RowFormat));
                }
                Phase::Rows => match current.result.rows.get(current.next_row) {
                    Some(MockRow {
                        kind: RowKind::Compute(_),
                        ..
                    }) => return Ok(PulledToken::token(ResultKind::Compute)),
                    Some(_) => return Ok(PulledToken::token(ResultKind::Row)),
                    None => current.phase = Phase::Done,
                },
                Phase::Done => {
                    current.phase = Phase::Finished;
                    let result = &current.result;
                    let kind = if result.in_proc {
                        ResultKind::DoneInProc
                    } else {
                        ResultKind::Done
                    };
                    let mut status = DoneStatus::empty();
                    if result.rows_affected >= 0 {
                        status |= DoneStatus::COUNT;
                    }
                    if result.failed {
                        status |= DoneStatus::ERROR;
                    }
                    if !self.pending.is_empty() {
                        status |= DoneStatus::MORE;
                    }
                    self.rows_affected = result.rows_affected;
                    return Ok(PulledToken::done(kind, status));
                }
                Phase::Finished => {}
            }
        }
    }

    fn send_cancel(&mut self) -> Result<(), TransportError> {
        self.alive()?;
        self.log.update(|log| log.cancels += 1);
        Ok(())
    }

    fn process_cancel(&mut self) -> Result<(), TransportError> {
        self.alive()?;
        self.pending.clear();
        self.current = None;
        Ok(())
    }

    fn rows_affected(&self) -> i64 {
        self.rows_affected
    }

    fn column_count(&self) -> usize {
        self.columns().len()
    }

    fn column_name(&self, ordinal: usize) -> Result<String, TransportError> {
        self.column(ordinal).map(|c| c.name.clone())
    }

    fn column_type(&self, ordinal: usize) -> Result<u8, TransportError> {
        self.column(ordinal).map(|c| c.type_code)
    }

    fn column_precision_scale(&self, ordinal: usize) -> Result<(u8, u8), TransportError> {
        self.column(ordinal).map(|c| (c.precision, c.scale))
    }

    fn next_row(&mut self) -> Result<RowStatus, TransportError> {
        self.alive()?;
        let Some(current) = self.current.as_mut().filter(|c| c.phase == Phase::Rows) else {
            return Ok(RowStatus::NoMoreRows);
        };

        match current.result.rows.get(current.next_row) {
            Some(row) => {
                let kind = row.kind;
                current.row = Some(current.next_row);
                current.next_row += 1;
                Ok(RowStatus::Row(kind))
            }
            None => {
                current.phase = Phase::Finished;
                current.row = None;
                self.rows_affected = current.result.rows_affected;
                if current.result.failed {
                    return Ok(RowStatus::Failed);
                }
                Ok(RowStatus::NoMoreRows)
            }
        }
    }

    fn column_data(&self, _row: RowKind, ordinal: usize) -> Result<ColumnData, TransportError> {
        let column = self.column(ordinal)?;
        let value = self
            .current
            .as_ref()
            .and_then(|c| c.result.rows.get(c.row?))
            .and_then(|row| row.values.get(ordinal))
            .ok_or(TransportError::ColumnOutOfRange {
                ordinal,
                count: self.columns().len(),
            })?;

        Ok(match value.encode() {
            Some(data) => ColumnData::new(column.type_code, data),
            None => ColumnData::null(column.type_code),
        })
    }
}
