//! # tds-protocol
//!
//! Wire-level constants of the Tabular Data Stream protocol as seen by a
//! DB-Library style client: the Sybase/SQL Server column type codes, the
//! classification of result tokens pulled from a response stream, and the
//! table of protocol versions a session may request.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It contains no framing or
//! networking logic; transports report what they read in terms of the types
//! defined here and higher-level crates drive the session state machine on
//! top of them.
//!
//! ## Example
//!
//! ```rust
//! use tds_protocol::{DoneStatus, PulledToken, ResultKind, TypeId};
//!
//! assert_eq!(TypeId::from_u8(56), Some(TypeId::Int4));
//!
//! let token = PulledToken::done(ResultKind::Done, DoneStatus::COUNT);
//! assert!(!token.is_error());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod token;
pub mod types;
pub mod version;

pub use error::ProtocolError;
pub use token::{
    DoneStatus, PulledToken, ResultKind, RowKind, RowStatus, TokenFilter, TokenStatus,
};
pub use types::{TypeId, codes};
pub use version::TdsVersion;
