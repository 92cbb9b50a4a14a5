//! SQL literal quoting and parameter substitution.
//!
//! Statements are sent as plain SQL text, so parameters are rendered as
//! literals and spliced into the template before submission.
//!
//! ```rust
//! use mssql_types::{Param, Params, quote::substitute};
//!
//! let sql = substitute(
//!     "select * from t where id in (%s)",
//!     &Params::positional([Param::list([1, 2, 3])]),
//!     "utf8",
//! )
//! .unwrap();
//! assert_eq!(sql, "select * from t where id in ((1,2,3))");
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::Timelike;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::charset::encoding_for;
use crate::error::TypeError;
use crate::params::{Param, Params};
use crate::value::SqlValue;

#[allow(clippy::unwrap_used)]
static POSITIONAL_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"%(s|d)").unwrap());

#[allow(clippy::unwrap_used)]
static NAMED_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"%\(([^\)]+)\)s").unwrap());

/// Parameters after quoting, shaped like the [`Params`] they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quoted {
    /// One literal.
    Scalar(String),
    /// One flattened literal per position.
    Positional(Vec<String>),
    /// One flattened literal per key.
    Named(HashMap<String, String>),
}

/// Render a value as a SQL literal.
///
/// | value | literal |
/// |---|---|
/// | NULL | `NULL` |
/// | bool | `1` / `0` |
/// | integer, decimal | plain decimal text |
/// | float | shortest round-trip decimal text |
/// | bytes, 7-bit without NUL | `'...'` with quotes doubled |
/// | other bytes | `0x` followed by lowercase hex |
/// | text | `N'...'` with quotes doubled |
/// | date-time | `{ts 'YYYY-MM-DD HH:MM:SS.mmm'}` |
/// | date | `{d 'YYYY-MM-DD'}` |
///
/// Text must be encodable in `charset`. UUIDs have no literal form here.
pub fn render_literal(value: &SqlValue, charset: &str) -> Result<String, TypeError> {
    render(value, encoding_for(charset)?)
}

/// Render a parameter slot: scalars as [`render_literal`], lists as
/// `(v1,v2,...)`. Any unsupported element fails the whole slot.
pub fn flatten(param: &Param, charset: &str) -> Result<String, TypeError> {
    flatten_with(param, encoding_for(charset)?)
}

/// Quote every parameter, keeping the shape of `params`.
pub fn quote_params(params: &Params, charset: &str) -> Result<Quoted, TypeError> {
    let encoding = encoding_for(charset)?;
    match params {
        Params::Scalar(value) => render(value, encoding).map(Quoted::Scalar),
        Params::Positional(slots) => slots
            .iter()
            .map(|slot| flatten_with(slot, encoding))
            .collect::<Result<Vec<_>, _>>()
            .map(Quoted::Positional),
        Params::Named(slots) => slots
            .iter()
            .map(|(key, slot)| Ok((key.clone(), flatten_with(slot, encoding)?)))
            .collect::<Result<HashMap<_, _>, TypeError>>()
            .map(Quoted::Named),
    }
}

/// Substitute quoted parameters into `template`.
///
/// Named parameters fill `%(key)s` placeholders; every referenced key must be
/// present and repeated keys are filled independently. Scalar and positional
/// parameters fill `%s`/`%d` placeholders in order; surplus values are
/// ignored but a surplus placeholder is an error.
pub fn substitute(template: &str, params: &Params, charset: &str) -> Result<String, TypeError> {
    match quote_params(params, charset)? {
        Quoted::Named(values) => rewrite(template, &NAMED_PLACEHOLDER, |caps| {
            let key = caps.get(1).map_or("", |m| m.as_str());
            values
                .get(key)
                .map(String::as_str)
                .ok_or_else(|| TypeError::MissingPlaceholder(key.to_string()))
        }),
        Quoted::Scalar(value) => positional(template, std::slice::from_ref(&value)),
        Quoted::Positional(values) => positional(template, &values),
    }
}

fn positional(template: &str, values: &[String]) -> Result<String, TypeError> {
    let mut next = values.iter();
    rewrite(template, &POSITIONAL_PLACEHOLDER, |_| {
        next.next()
            .map(String::as_str)
            .ok_or(TypeError::InsufficientParameters)
    })
}

/// Replace every match of `pattern` in `template`.
///
/// Match positions come from the original template; `offset` carries the
/// accumulated length difference of the replacements already applied.
fn rewrite<'v, F>(template: &str, pattern: &Regex, mut replacement: F) -> Result<String, TypeError>
where
    F: FnMut(&regex::Captures<'_>) -> Result<&'v str, TypeError>,
{
    let mut sql = template.to_string();
    let mut offset: isize = 0;

    for caps in pattern.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let value = replacement(&caps)?;

        let start = whole.start().saturating_add_signed(offset);
        let end = whole.end().saturating_add_signed(offset);
        sql.replace_range(start..end, value);
        offset += value.len() as isize - whole.len() as isize;
    }

    Ok(sql)
}

fn flatten_with(param: &Param, encoding: &'static Encoding) -> Result<String, TypeError> {
    match param {
        Param::Scalar(value) => render(value, encoding),
        Param::List(values) => {
            let rendered = values
                .iter()
                .map(|value| render(value, encoding))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({})", rendered.join(",")))
        }
    }
}

fn render(value: &SqlValue, encoding: &'static Encoding) -> Result<String, TypeError> {
    Ok(match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(v) => String::from(if *v { "1" } else { "0" }),
        SqlValue::TinyInt(v) => v.to_string(),
        SqlValue::SmallInt(v) => v.to_string(),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::BigInt(v) => v.to_string(),
        SqlValue::Float(v) => render_float(f64::from(*v).is_finite(), format!("{v:?}"))?,
        SqlValue::Double(v) => render_float(v.is_finite(), format!("{v:?}"))?,
        SqlValue::Decimal(v) => v.to_string(),
        SqlValue::Binary(bytes) => render_bytes(bytes),
        SqlValue::String(text) => render_text(text, encoding)?,
        SqlValue::DateTime(dt) => {
            // Leap seconds report nanoseconds past 999_999_999
            let millis = (dt.nanosecond() % 1_000_000_000) / 1_000_000;
            format!("{{ts '{}.{millis:03}'}}", dt.format("%Y-%m-%d %H:%M:%S"))
        }
        SqlValue::Date(d) => format!("{{d '{}'}}", d.format("%Y-%m-%d")),
        SqlValue::Uuid(_) => {
            return Err(TypeError::UnsupportedType {
                type_name: value.type_name(),
            });
        }
    })
}

fn render_float(finite: bool, text: String) -> Result<String, TypeError> {
    if finite {
        Ok(text)
    } else {
        Err(TypeError::OutOfRange {
            target_type: "FLOAT literal",
        })
    }
}

fn render_bytes(bytes: &[u8]) -> String {
    if bytes.iter().all(|b| (1..0x80).contains(b)) {
        // 7-bit without NUL: all bytes are ASCII, so this is valid UTF-8
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        format!("'{}'", text.replace('\'', "''"))
    } else {
        let mut hex = String::with_capacity(2 + bytes.len() * 2);
        hex.push_str("0x");
        for b in bytes {
            let _ = write!(hex, "{b:02x}");
        }
        hex
    }
}

fn render_text(text: &str, encoding: &'static Encoding) -> Result<String, TypeError> {
    let (_, _, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(TypeError::InvalidEncoding(format!(
            "text cannot be represented in {}",
            encoding.name()
        )));
    }
    Ok(format!("N'{}'", text.replace('\'', "''")))
}
