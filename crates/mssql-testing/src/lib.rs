//! # mssql-testing
//!
//! Test infrastructure for TDS session development.
//!
//! This crate provides a scripted [`MockTransport`] so that sessions can be
//! exercised without a server, plus fixtures shared by the integration
//! tests.
//!
//! ## Features
//!
//! - Scripted responses keyed by SQL text
//! - Diagnostics on login, submit and database switch
//! - A log of submitted SQL, cancels and close calls
//! - Tracing setup and serialization of fallback-record tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_session::Session;
//! use mssql_testing::{MockColumn, MockResponse, MockTransport, ScalarValue, fixtures};
//!
//! let transport = MockTransport::builder()
//!     .with_response(
//!         "select 12",
//!         MockResponse::scalar(MockColumn::tinyint(""), ScalarValue::TinyInt(12)),
//!     )
//!     .build();
//!
//! let mut session = Session::open(&fixtures::test_config(), transport)?;
//! let value = session.execute_scalar("select 12", None)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod mock_transport;

pub use mock_transport::{
    MockColumn, MockLog, MockLogHandle, MockResponse, MockResult, MockRow, MockTransport,
    MockTransportBuilder, ScalarValue,
};
