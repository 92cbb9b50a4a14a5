//! Client charset resolution.
//!
//! Sessions name their charset the way DB-Library does (`utf8`, `iso_1`,
//! `cp1252`, ...). Labels are resolved through the WHATWG label table of
//! `encoding_rs`, with a few Sybase spellings mapped first.

use encoding_rs::Encoding;

use crate::error::TypeError;

/// Charset used for literals when a session has none configured.
pub const DEFAULT_CHARSET: &str = "utf8";

/// Resolve a charset label to an encoding.
pub fn encoding_for(label: &str) -> Result<&'static Encoding, TypeError> {
    let normalized = label.trim().to_ascii_lowercase();
    let label = match normalized.as_str() {
        "iso_1" | "iso-1" => "iso-8859-1",
        "utf_8" => "utf-8",
        "roman8" => "iso-8859-1",
        other => other,
    };
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| TypeError::InvalidEncoding(format!("unknown charset: {label}")))
}

/// Resolve an optional label, treating `None` and the empty string as unset.
pub fn optional_encoding(label: Option<&str>) -> Result<Option<&'static Encoding>, TypeError> {
    match label {
        Some(label) if !label.trim().is_empty() => encoding_for(label).map(Some),
        _ => Ok(None),
    }
}
