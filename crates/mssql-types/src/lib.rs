//! # mssql-types
//!
//! Host values for a TDS session and the conversions around them.
//!
//! This crate decodes raw column data handed over by a transport into
//! [`SqlValue`]s, classifies wire types into DB-API categories, and renders
//! values back into SQL literals for parameter substitution.
//!
//! ## Type Mappings
//!
//! | Wire type | Rust Type |
//! |-----------------|-----------|
//! | `SYBBIT`, `SYBBITN` | `bool` |
//! | `SYBINT1` | `u8` |
//! | `SYBINT2` | `i16` |
//! | `SYBINT4` | `i32` |
//! | `SYBINT8` | `i64` |
//! | `SYBREAL` | `f32` |
//! | `SYBFLT8` | `f64` |
//! | `SYBMONEY`, `SYBNUMERIC`, `SYBDECIMAL` | `rust_decimal::Decimal` |
//! | `SYBCHAR`, `SYBVARCHAR`, `SYBTEXT` | `String` (with a charset) or bytes |
//! | `SYBDATETIME`, `SYBDATETIME4` | `chrono::NaiveDateTime` |
//! | `SYBUNIQUE` | `uuid::Uuid` |
//! | anything else | `bytes::Bytes` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod api_type;
pub mod charset;
pub mod decode;
pub mod error;
pub mod from_sql;
pub mod params;
pub mod quote;
pub mod value;

pub use api_type::ApiType;
pub use decode::{CrackDateTime, DecodeContext, TdsDateCracker, decode_column};
pub use error::TypeError;
pub use from_sql::FromSql;
pub use params::{Param, Params};
pub use quote::{Quoted, flatten, quote_params, render_literal, substitute};
pub use value::SqlValue;
