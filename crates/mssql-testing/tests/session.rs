//! Session behavior against the scripted transport.
//!
//! These tests drive a real [`Session`] over [`MockTransport`], so the full
//! path from SQL text to decoded rows and raised diagnostics is covered
//! without a server.
//!
//! ```bash
//! cargo test -p mssql-testing --test session
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::NaiveDate;
use mssql_session::{
    ApiType, Config, DEFAULT_SESSION_OPTIONS, Error, ExecuteMode, ExecuteOutcome, LibraryError,
    Params, RowKind, ServerMessage, Session, SqlValue, TransportError, registry,
};
use mssql_testing::fixtures::{fallback_guard, init_tracing, test_config};
use mssql_testing::{MockColumn, MockResponse, MockResult, MockRow, MockTransport, ScalarValue};
use rust_decimal::Decimal;

fn open(transport: MockTransport) -> Session<MockTransport> {
    init_tracing();
    Session::open(&test_config(), transport).expect("session should open")
}

fn users() -> MockResponse {
    MockResponse::rows(
        vec![MockColumn::int("id"), MockColumn::varchar("name")],
        vec![
            vec![ScalarValue::Int(1), ScalarValue::Text("alice".into())],
            vec![ScalarValue::Int(2), ScalarValue::Text("bob".into())],
        ],
    )
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_open_and_close() {
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let mut session = open(transport);
    let id = session.id();

    assert!(session.is_connected());
    assert!(registry::is_live(id));
    assert_eq!(session.server(), "mock");
    assert_eq!(session.charset(), Some("utf8"));

    session.close();
    assert!(!session.is_connected());
    assert!(!registry::is_live(id));
    assert!(log.closed());

    // Closing again is a no-op.
    session.close();
    assert!(!session.is_connected());
}

#[test]
fn test_operations_after_close_fail() {
    let mut session = open(MockTransport::builder().build());
    session.close();

    assert!(matches!(session.cancel(), Err(Error::NotConnected)));
    assert!(matches!(
        session.execute_non_query("select 1", None),
        Err(Error::NotConnected)
    ));
    assert!(matches!(session.fetch_row(), Err(Error::NotConnected)));
    assert!(matches!(session.select_db("pubs"), Err(Error::NotConnected)));
}

#[test]
fn test_drop_closes_transport() {
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let id = {
        let session = open(transport);
        session.id()
    };
    assert!(log.closed());
    assert!(!registry::is_live(id));
}

#[test]
fn test_cancel_with_nothing_pending() {
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let mut session = open(transport);

    session.cancel().unwrap();
    session.cancel().unwrap();
    assert_eq!(log.cancels(), 2);
}

#[test]
fn test_connection_string_reaches_transport() {
    let config =
        Config::from_connection_string("Server=db1,5000;User Id=bob;Password=x;Charset=utf8")
            .unwrap();
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let _session = Session::open(&config, transport).unwrap();

    let snapshot = log.snapshot();
    assert_eq!(snapshot.host.as_deref(), Some("db1:5000"));
    assert_eq!(snapshot.user.as_deref(), Some("bob"));
}

#[test]
fn test_invalid_config_is_rejected_before_login() {
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let config = test_config().tds_version("9.9");

    let err = Session::open(&config, transport).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion(_)));
    assert!(log.snapshot().host.is_none());
}

// =============================================================================
// Login Diagnostics
// =============================================================================

#[test]
fn test_open_failure_reports_fallback_diagnostic() {
    let _guard = fallback_guard();
    let transport = MockTransport::builder()
        .with_login_message(ServerMessage::new(18456, 14, "Login failed for user 'sa'."))
        .with_login_failure("login rejected")
        .build();

    let err = Session::open(&test_config(), transport).unwrap_err();
    match err {
        Error::Connection {
            message,
            diagnostic: Some(diagnostic),
        } => {
            assert!(message.contains("login rejected"));
            assert_eq!(diagnostic.number, 18456);
            assert_eq!(diagnostic.severity, 14);
            assert_eq!(diagnostic.message, "Login failed for user 'sa'.");
        }
        other => panic!("expected connection error, got {other:?}"),
    }

    // Raising consumed the fallback record.
    assert!(registry::last_message().is_empty());
}

#[test]
fn test_open_failure_with_network_error() {
    let _guard = fallback_guard();
    let transport = MockTransport::builder()
        .with_login_library_error(
            LibraryError::new(20009, 9, "Unable to connect").with_os_error(111, "connect"),
        )
        .with_login_failure("connection refused")
        .build();

    let err = Session::open(&test_config(), transport).unwrap_err();
    let diagnostic = err.database_error().expect("diagnostic should be attached");
    assert_eq!(diagnostic.number, 20009);
    assert_eq!(diagnostic.state, 111);
    assert_eq!(diagnostic.message, "Net-Lib error during connect");
}

#[test]
fn test_login_error_after_successful_login_fails_open() {
    let _guard = fallback_guard();
    let transport = MockTransport::builder()
        .with_login_message(ServerMessage::new(4060, 11, "Cannot open database 'x'."))
        .build();
    let log = transport.log();

    let err = Session::open(&test_config(), transport).unwrap_err();
    assert!(err.is_driver_error());
    let diagnostic = err.database_error().expect("diagnostic should be attached");
    assert_eq!(diagnostic.number, 4060);
    assert_eq!(diagnostic.severity, 11);
    assert!(log.closed());
    assert!(registry::last_message().is_empty());

    // A later, unrelated login failure does not inherit the old diagnostic.
    let transport = MockTransport::builder().with_login_failure("refused").build();
    match Session::open(&test_config(), transport).unwrap_err() {
        Error::Connection { diagnostic, .. } => assert!(diagnostic.is_none()),
        other => panic!("expected connection error, got {other:?}"),
    }
}

#[test]
fn test_login_messages_land_in_fallback() {
    let _guard = fallback_guard();
    let transport = MockTransport::builder()
        .with_login_message(ServerMessage::new(
            5701,
            0,
            "Changed database context to 'master'.",
        ))
        .build();

    let session = open(transport);
    let fallback = registry::last_message();
    assert_eq!(fallback.number, 5701);
    assert!(session.last_message().is_empty());
}

#[test]
fn test_init_sql_runs_after_login() {
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let config = test_config().with_default_options();
    let _session = Session::open(&config, transport).unwrap();

    assert_eq!(log.submitted(), vec![DEFAULT_SESSION_OPTIONS.to_string()]);
}

#[test]
fn test_init_sql_failure_closes_session() {
    let transport = MockTransport::builder()
        .with_response(
            "set bogus on",
            MockResponse::error(195, "'bogus' is not a recognized SET option."),
        )
        .build();
    let log = transport.log();
    let config = test_config().init_sql("set bogus on");

    let err = Session::open(&config, transport).unwrap_err();
    match &err {
        Error::Connection { message, .. } => {
            assert!(message.starts_with("could not set session options"));
        }
        other => panic!("expected connection error, got {other:?}"),
    }
    assert_eq!(err.database_error().unwrap().number, 195);
    assert!(log.closed());
}

// =============================================================================
// Severity Diagnostics
// =============================================================================

#[test]
fn test_worst_message_is_raised() {
    let response = MockResponse::affected(1)
        .with_message(ServerMessage::new(1, 5, "minor"))
        .with_message(ServerMessage::new(2, 9, "major").with_state(3).with_line(7));
    let mut session = open(MockTransport::builder().with_response("update t", response).build());

    let err = session.execute_non_query("update t", None).unwrap_err();
    let db = err.database_error().unwrap();
    assert_eq!(db.number, 2);
    assert_eq!(db.severity, 9);
    assert_eq!(db.state, 3);
    assert_eq!(db.line, 7);
    assert_eq!(err.severity(), Some(9));

    // The record was reset by raising.
    assert!(session.last_message().is_empty());
}

#[test]
fn test_equal_severity_later_message_wins() {
    let response = MockResponse::affected(1)
        .with_message(ServerMessage::new(1, 16, "first"))
        .with_message(ServerMessage::new(2, 16, "second"));
    let mut session = open(MockTransport::builder().with_response("update t", response).build());

    let err = session.execute_non_query("update t", None).unwrap_err();
    assert!(err.is_server_error(2));
}

#[test]
fn test_informational_message_does_not_raise() {
    let response = MockResponse::affected(4).with_message(ServerMessage::new(
        3604,
        3,
        "Duplicate key was ignored.",
    ));
    let mut session = open(MockTransport::builder().with_response("insert t", response).build());

    let result = session.execute_non_query("insert t", None).unwrap();
    assert_eq!(result.rows_affected, 4);

    let last = session.last_message();
    assert_eq!(last.number, 3604);
    assert_eq!(last.severity, 3);
    assert_eq!(last.message, "Duplicate key was ignored.");

    // The next operation starts from a clean record.
    session.execute_non_query("select 1", None).unwrap();
    assert!(session.last_message().is_empty());
}

#[test]
fn test_server_error_and_recovery() {
    let transport = MockTransport::builder()
        .with_response(
            "select * from nope",
            MockResponse::error(208, "Invalid object name 'nope'."),
        )
        .with_response("select * from users", users())
        .build();
    let mut session = open(transport);

    let err = session.execute_query("select * from nope", None).unwrap_err();
    assert!(err.is_server_error(208));
    assert!(err.is_database_error());
    assert!(err.to_string().contains("Invalid object name 'nope'."));

    let rows = session
        .execute_query("select * from users", None)
        .unwrap()
        .collect_all()
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_failed_statement_without_diagnostic() {
    let transport = MockTransport::builder()
        .with_response(
            "exec broken",
            MockResponse::results(vec![MockResult::done().failed()]),
        )
        .build();
    let mut session = open(transport);

    let err = session.execute_non_query("exec broken", None).unwrap_err();
    assert!(matches!(err, Error::StatementFailed));
    assert!(err.is_driver_error());
}

#[test]
fn test_transport_failure_propagates() {
    let transport = MockTransport::builder()
        .with_response("select 1", MockResponse::broken(TransportError::Dead))
        .build();
    let mut session = open(transport);

    let err = session.execute_non_query("select 1", None).unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Dead)));
}

// =============================================================================
// Statement Execution
// =============================================================================

#[test]
fn test_execute_scalar_tinyint() {
    let transport = MockTransport::builder()
        .with_response(
            "select 12",
            MockResponse::scalar(MockColumn::tinyint(""), ScalarValue::TinyInt(12)),
        )
        .build();
    let mut session = open(transport);

    let value = session.execute_scalar("select 12", None).unwrap();
    assert_eq!(value, Some(SqlValue::TinyInt(12)));
}

#[test]
fn test_execute_row_unnamed_columns() {
    let transport = MockTransport::builder()
        .with_response(
            "select 'test', 20",
            MockResponse::rows(
                vec![MockColumn::varchar(""), MockColumn::int("")],
                vec![vec![ScalarValue::Text("test".into()), ScalarValue::Int(20)]],
            ),
        )
        .build();
    let mut session = open(transport);

    let row = session.execute_row("select 'test', 20", None).unwrap().unwrap();
    assert_eq!(row.get::<String>(0).unwrap(), "test");
    assert_eq!(row.get::<i32>(1).unwrap(), 20);
    assert_eq!(row.named_values().count(), 0);
    assert!(!row.columns()[0].is_named());
}

#[test]
fn test_execute_modes() {
    let transport = MockTransport::builder()
        .with_response("select * from users", users())
        .with_response("delete users", MockResponse::affected(2))
        .build();
    let mut session = open(transport);

    let outcome = session
        .execute("delete users", None, ExecuteMode::NonQuery)
        .unwrap();
    assert!(matches!(outcome, ExecuteOutcome::NonQuery(r) if r.rows_affected == 2));

    let outcome = session
        .execute("select * from users", None, ExecuteMode::Scalar)
        .unwrap();
    assert_eq!(outcome, ExecuteOutcome::Scalar(Some(SqlValue::Int(1))));

    let outcome = session
        .execute("select * from users", None, ExecuteMode::Query)
        .unwrap();
    assert_eq!(outcome, ExecuteOutcome::Query);
    let header = session.column_header().unwrap().unwrap();
    assert_eq!(header[1].name, "name");
}

#[test]
fn test_params_are_substituted() {
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let mut session = open(transport);

    let params = Params::positional([SqlValue::from("O'Brien"), SqlValue::from(5)]);
    session
        .execute_non_query("insert into t values (%s, %d)", Some(&params))
        .unwrap();

    let params = Params::named([("id", SqlValue::from(7))]);
    session
        .execute_non_query("delete t where id = %(id)s", Some(&params))
        .unwrap();

    assert_eq!(
        log.submitted(),
        vec![
            "insert into t values (N'O''Brien', 5)".to_string(),
            "delete t where id = 7".to_string(),
        ]
    );
}

#[test]
fn test_sql_without_params_is_sent_verbatim() {
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let mut session = open(transport);

    session
        .execute_non_query("select * from t where name like 'a%s'", None)
        .unwrap();
    session
        .execute_non_query("select 100%", Some(&Params::positional(Vec::<SqlValue>::new())))
        .unwrap();

    assert_eq!(
        log.submitted(),
        vec![
            "select * from t where name like 'a%s'".to_string(),
            "select 100%".to_string(),
        ]
    );
}

#[test]
fn test_missing_placeholder_fails_before_submit() {
    let transport = MockTransport::builder().build();
    let log = transport.log();
    let mut session = open(transport);

    let params = Params::named([("id", SqlValue::from(7))]);
    let err = session
        .execute_non_query("delete t where name = %(name)s", Some(&params))
        .unwrap_err();
    assert!(matches!(err, Error::Type(_)));
    assert!(log.submitted().is_empty());
}

// =============================================================================
// Results and Rows
// =============================================================================

#[test]
fn test_query_reads_all_rows() {
    let transport = MockTransport::builder()
        .with_response("select * from users", users())
        .build();
    let mut session = open(transport);

    let mut names = Vec::new();
    for row in session.execute_query("select * from users", None).unwrap() {
        let row = row.unwrap();
        names.push(row.get_by_name::<String>("name").unwrap());
    }

    assert_eq!(names, vec!["alice", "bob"]);
    assert_eq!(session.rows_affected(), 2);
    assert_eq!(session.fetch_row().unwrap(), None);
}

#[test]
fn test_column_header_describes_current_result() {
    let transport = MockTransport::builder()
        .with_response("select * from users", users())
        .build();
    let mut session = open(transport);

    session.execute_query("select * from users", None).unwrap();
    let header = session.column_header().unwrap().unwrap();
    let described: Vec<_> = header.iter().map(|c| (c.name.as_str(), c.api_type)).collect();
    assert_eq!(described, vec![("id", ApiType::Number), ("name", ApiType::String)]);

    // Once every row is read the response is exhausted.
    while session.fetch_row().unwrap().is_some() {}
    assert!(session.column_header().unwrap().is_none());
}

#[test]
fn test_column_header_is_none_without_columns() {
    let transport = MockTransport::builder()
        .with_response("update users set name = 'x'", MockResponse::affected(2))
        .build();
    let mut session = open(transport);

    let result = session
        .execute_non_query("update users set name = 'x'", None)
        .unwrap();
    assert_eq!(result.rows_affected, 2);
    assert!(session.column_header().unwrap().is_none());
}

#[test]
fn test_response_without_tokens_is_exhausted() {
    let transport = MockTransport::builder()
        .with_response("-- nothing", MockResponse::results(Vec::new()))
        .build();
    let mut session = open(transport);

    session.execute_non_query("-- nothing", None).unwrap();

    let mut rows = session.execute_query("-- nothing", None).unwrap();
    assert!(rows.next().is_none());
    drop(rows);
    assert!(session.column_header().unwrap().is_none());
}

#[test]
fn test_multiple_results() {
    let response = MockResponse::results(vec![
        MockResult::affected(3),
        MockResult::rows(
            vec![MockColumn::int("a")],
            vec![vec![ScalarValue::Int(1)], vec![ScalarValue::Int(2)]],
        ),
        MockResult::rows(
            vec![MockColumn::varchar("b")],
            vec![vec![ScalarValue::Text("x".into())]],
        ),
    ]);
    let mut session = open(MockTransport::builder().with_response("batch", response).build());

    let first = session.execute_query("batch", None).unwrap().collect_all().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].columns()[0].name, "a");

    assert!(session.next_result().unwrap());
    let second = session.rows().unwrap().collect_all().unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].get::<String>(0).unwrap(), "x");

    assert!(!session.next_result().unwrap());
}

#[test]
fn test_next_result_skips_unread_rows() {
    let response = users().then(MockResult::rows(
        vec![MockColumn::bigint("total")],
        vec![vec![ScalarValue::BigInt(2)]],
    ));
    let mut session = open(MockTransport::builder().with_response("batch", response).build());

    let first = session.execute_row("batch", None).unwrap().unwrap();
    assert_eq!(first.get::<i32>(0).unwrap(), 1);

    assert!(session.next_result().unwrap());
    let total = session.fetch_row().unwrap().unwrap();
    assert_eq!(total.get::<i64>(0).unwrap(), 2);
}

#[test]
fn test_empty_select_has_columns_and_no_rows() {
    let response = MockResponse::rows(vec![MockColumn::int("id")], Vec::<MockRow>::new());
    let transport = MockTransport::builder()
        .with_response("select id from t", response)
        .build();
    let mut session = open(transport);

    let mut rows = session.execute_query("select id from t", None).unwrap();
    assert_eq!(rows.columns().unwrap().len(), 1);
    assert!(rows.next().is_none());
    assert!(rows.is_finished());
    drop(rows);

    assert_eq!(session.rows_affected(), 0);
}

#[test]
fn test_non_query_stops_at_first_result_with_columns() {
    let transport = MockTransport::builder()
        .with_response(
            "insert; select",
            MockResponse::affected(1).then(MockResult::rows(
                vec![MockColumn::int("id")],
                vec![vec![ScalarValue::Int(9)]],
            )),
        )
        .build();
    let log = transport.log();
    let mut session = open(transport);
    let cancels = log.cancels();

    let result = session.execute_non_query("insert; select", None).unwrap();
    assert_eq!(result.rows_affected, 1);
    assert_eq!(session.fetch_row().unwrap(), None);
    assert_eq!(log.cancels(), cancels + 2);
}

#[test]
fn test_procedure_results() {
    let response = MockResponse::results(vec![
        MockResult::affected(1).in_proc(),
        MockResult::rows(vec![MockColumn::int("id")], vec![vec![ScalarValue::Int(4)]]),
        MockResult::done(),
    ]);
    let mut session = open(MockTransport::builder().with_response("exec p", response).build());

    let value = session.execute_scalar("exec p", None).unwrap();
    assert_eq!(value, Some(SqlValue::Int(4)));
}

#[test]
fn test_compute_rows() {
    let response = MockResponse::rows(
        vec![MockColumn::int("n")],
        vec![
            MockRow::new(vec![ScalarValue::Int(1)]),
            MockRow::new(vec![ScalarValue::Int(2)]),
            MockRow::compute(1, vec![ScalarValue::Int(3)]),
        ],
    );
    let transport = MockTransport::builder()
        .with_response("select n compute sum(n)", response)
        .build();
    let mut session = open(transport);

    let rows = session
        .execute_query("select n compute sum(n)", None)
        .unwrap()
        .collect_all()
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].kind(), RowKind::Regular);
    assert_eq!(rows[2].kind(), RowKind::Compute(1));
    assert_eq!(rows[2].get::<i32>(0).unwrap(), 3);
}

#[test]
fn test_new_statement_discards_pending_rows() {
    let transport = MockTransport::builder()
        .with_response("select * from users", users())
        .with_response(
            "select 12",
            MockResponse::scalar(MockColumn::tinyint(""), ScalarValue::TinyInt(12)),
        )
        .build();
    let mut session = open(transport);

    let first = session.execute_row("select * from users", None).unwrap();
    assert!(first.is_some());

    let value = session.execute_scalar("select 12", None).unwrap();
    assert_eq!(value, Some(SqlValue::TinyInt(12)));
    assert_eq!(session.fetch_row().unwrap(), None);
}

#[test]
fn test_decoded_column_types() {
    let stamp = NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(7, 8, 9)
        .unwrap();
    let response = MockResponse::rows(
        vec![
            MockColumn::money("price"),
            MockColumn::datetime("created"),
            MockColumn::varchar("note"),
        ],
        vec![vec![
            ScalarValue::Money(Decimal::new(12_345_678, 4)),
            ScalarValue::DateTime(stamp),
            ScalarValue::Null,
        ]],
    );
    let mut session = open(MockTransport::builder().with_response("select *", response).build());

    let row = session.execute_row("select *", None).unwrap().unwrap();
    assert_eq!(row.get::<Decimal>(0).unwrap(), Decimal::new(12_345_678, 4));
    assert_eq!(row.get_by_name::<chrono::NaiveDateTime>("created").unwrap(), stamp);
    assert!(row.is_null(2));
    assert_eq!(row.try_get_by_name::<String>("note"), None);
}

// =============================================================================
// Database Selection
// =============================================================================

#[test]
fn test_select_db() {
    let transport = MockTransport::builder()
        .with_database_error("nope", 911, "Database 'nope' does not exist.")
        .build();
    let log = transport.log();
    let mut session = open(transport);

    session.select_db("pubs").unwrap();
    assert_eq!(session.database(), Some("pubs"));

    let err = session.select_db("nope").unwrap_err();
    assert!(err.is_server_error(911));
    assert_eq!(session.database(), Some("pubs"));
    assert_eq!(log.snapshot().databases, vec!["pubs".to_string()]);
}
