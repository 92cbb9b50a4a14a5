//! Column decoding for SQL values.
//!
//! A transport hands over each column as a wire type code, the declared data
//! length and the raw bytes DB-Library keeps for it (`None` when the column
//! holds no data). [`decode_column`] turns that triple into a [`SqlValue`].
//!
//! Date-time columns are broken into calendar fields by a [`CrackDateTime`]
//! implementation supplied by the transport; [`TdsDateCracker`] handles the
//! standard server layouts.

use bytes::Bytes;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use encoding_rs::Encoding;
use rust_decimal::Decimal;
use tds_protocol::TypeId;

use crate::error::TypeError;
use crate::value::SqlValue;

/// Scale of the MONEY and SMALLMONEY types.
pub const MONEY_SCALE: u32 = 4;

/// Breaks a date-time column into a calendar value.
pub trait CrackDateTime {
    /// Decode `data` for a column of type `type_id`.
    ///
    /// `type_id` is one of `DateTime`, `DateTime4` or `DateTimeN`; for the
    /// nullable variant the layout follows from `data.len()`.
    fn crack(&self, type_id: TypeId, data: &[u8]) -> Result<NaiveDateTime, TypeError>;
}

/// Cracks the standard DATETIME and SMALLDATETIME layouts.
///
/// * DATETIME: 4 bytes days since 1900-01-01, then 4 bytes 300ths of a second.
/// * SMALLDATETIME: 2 bytes days since 1900-01-01, then 2 bytes minutes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TdsDateCracker;

impl CrackDateTime for TdsDateCracker {
    fn crack(&self, type_id: TypeId, data: &[u8]) -> Result<NaiveDateTime, TypeError> {
        match (type_id, data.len()) {
            (TypeId::DateTime4, _) | (TypeId::DateTimeN, 4) => crack_smalldatetime(data),
            (TypeId::DateTime, _) | (TypeId::DateTimeN, 8) => crack_datetime(data),
            (_, len) => Err(TypeError::InvalidDateTime(format!(
                "cannot crack {len} bytes of {type_id}"
            ))),
        }
    }
}

/// Everything about a column the decoder needs beyond its bytes.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Session charset for character columns. `None` leaves them as bytes.
    pub encoding: Option<&'static Encoding>,
    /// Server-declared precision (NUMERIC/DECIMAL).
    pub precision: u8,
    /// Server-declared scale (NUMERIC/DECIMAL).
    pub scale: u8,
    /// Date cracking routine.
    pub cracker: &'a dyn CrackDateTime,
}

impl<'a> DecodeContext<'a> {
    /// Create a context with no charset and zero precision/scale.
    #[must_use]
    pub fn new(cracker: &'a dyn CrackDateTime) -> Self {
        Self {
            encoding: None,
            precision: 0,
            scale: 0,
            cracker,
        }
    }

    /// Set the charset used for character columns.
    #[must_use]
    pub fn with_encoding(mut self, encoding: Option<&'static Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the declared precision and scale.
    #[must_use]
    pub fn with_precision_scale(mut self, precision: u8, scale: u8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }
}

impl std::fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeContext")
            .field("encoding", &self.encoding.map(Encoding::name))
            .field("precision", &self.precision)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

/// Decode one column value.
///
/// `data` is `None` when the transport reports no data for the column; that
/// decodes to [`SqlValue::Null`] whatever the declared type. Unknown type
/// codes decode to [`SqlValue::Binary`] truncated to `length`.
pub fn decode_column(
    type_code: u8,
    length: usize,
    data: Option<&[u8]>,
    ctx: &DecodeContext<'_>,
) -> Result<SqlValue, TypeError> {
    let Some(data) = data else {
        return Ok(SqlValue::Null);
    };
    let data = &data[..length.min(data.len())];

    let Some(type_id) = TypeId::from_u8(type_code) else {
        return Ok(binary(data));
    };

    match type_id {
        TypeId::Bit | TypeId::BitN => decode_bit(data),
        TypeId::Int1 | TypeId::Int2 | TypeId::Int4 | TypeId::Int8 => {
            decode_intn(fixed_width(type_id, data)?)
        }
        TypeId::IntN => decode_intn(data),
        TypeId::Float4 | TypeId::Float8 => decode_float(fixed_width(type_id, data)?),
        TypeId::FloatN => decode_float(data),
        TypeId::Money | TypeId::Money4 => decode_money(fixed_width(type_id, data)?),
        TypeId::MoneyN => decode_money(data),
        TypeId::DecimalN | TypeId::NumericN => decode_decimal(data, ctx.scale),
        TypeId::DateTime | TypeId::DateTime4 | TypeId::DateTimeN => {
            ctx.cracker.crack(type_id, data).map(SqlValue::DateTime)
        }
        TypeId::Guid => decode_guid(data),
        ty if ty.is_character() => match ctx.encoding {
            Some(encoding) => decode_text(data, encoding),
            None => Ok(binary(data)),
        },
        _ => Ok(binary(data)),
    }
}

fn binary(data: &[u8]) -> SqlValue {
    SqlValue::Binary(Bytes::copy_from_slice(data))
}

fn fixed_width(type_id: TypeId, data: &[u8]) -> Result<&[u8], TypeError> {
    match type_id.fixed_size() {
        Some(needed) => data.get(..needed).ok_or(TypeError::BufferTooSmall {
            needed,
            available: data.len(),
        }),
        None => Ok(data),
    }
}

fn fixed<const N: usize>(data: &[u8]) -> Result<[u8; N], TypeError> {
    data.get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(TypeError::BufferTooSmall {
            needed: N,
            available: data.len(),
        })
}

fn decode_bit(data: &[u8]) -> Result<SqlValue, TypeError> {
    let [byte] = fixed::<1>(data)?;
    Ok(SqlValue::Bool(byte != 0))
}

fn decode_intn(data: &[u8]) -> Result<SqlValue, TypeError> {
    match data.len() {
        1 => Ok(SqlValue::TinyInt(i8::from_le_bytes(fixed(data)?))),
        2 => Ok(SqlValue::SmallInt(i16::from_le_bytes(fixed(data)?))),
        4 => Ok(SqlValue::Int(i32::from_le_bytes(fixed(data)?))),
        8 => Ok(SqlValue::BigInt(i64::from_le_bytes(fixed(data)?))),
        len => Err(TypeError::InvalidBinary(format!(
            "invalid INTN length: {len}"
        ))),
    }
}

fn decode_float(data: &[u8]) -> Result<SqlValue, TypeError> {
    match data.len() {
        4 => Ok(SqlValue::Float(f32::from_le_bytes(fixed(data)?))),
        8 => Ok(SqlValue::Double(f64::from_le_bytes(fixed(data)?))),
        len => Err(TypeError::InvalidBinary(format!(
            "invalid FLTN length: {len}"
        ))),
    }
}

fn decode_money(data: &[u8]) -> Result<SqlValue, TypeError> {
    let units = match data.len() {
        4 => i64::from(i32::from_le_bytes(fixed(data)?)),
        8 => {
            // MONEY is sent as the high 32 bits followed by the low 32 bits.
            let high = i32::from_le_bytes(fixed(&data[..4])?);
            let low = u32::from_le_bytes(fixed(&data[4..])?);
            (i64::from(high) << 32) | i64::from(low)
        }
        len => {
            return Err(TypeError::InvalidBinary(format!(
                "invalid MONEYN length: {len}"
            )));
        }
    };
    Ok(SqlValue::Decimal(Decimal::new(units, MONEY_SCALE)))
}

fn decode_decimal(data: &[u8], scale: u8) -> Result<SqlValue, TypeError> {
    let Some((&sign, magnitude)) = data.split_first() else {
        return Err(TypeError::BufferTooSmall {
            needed: 1,
            available: 0,
        });
    };
    if magnitude.len() > 16 {
        return Err(TypeError::InvalidDecimal(format!(
            "{} byte mantissa exceeds 128 bits",
            magnitude.len()
        )));
    }

    let mut mantissa_bytes = [0u8; 16];
    mantissa_bytes[..magnitude.len()].copy_from_slice(magnitude);
    let mantissa = i128::try_from(u128::from_le_bytes(mantissa_bytes))
        .map_err(|_| TypeError::InvalidDecimal("mantissa out of range".to_string()))?;

    // Sign byte: 1 = positive, 0 = negative
    let signed = if sign == 0 { -mantissa } else { mantissa };
    Decimal::try_from_i128_with_scale(signed, u32::from(scale))
        .map(SqlValue::Decimal)
        .map_err(|e| TypeError::InvalidDecimal(e.to_string()))
}

fn decode_guid(data: &[u8]) -> Result<SqlValue, TypeError> {
    if data.len() != 16 {
        return Err(TypeError::InvalidUuid(format!(
            "invalid GUID length: {}",
            data.len()
        )));
    }

    // Stored mixed-endian: the first three groups are little-endian.
    let mut bytes = [0u8; 16];
    bytes[..4].copy_from_slice(&data[..4]);
    bytes[..4].reverse();
    bytes[4..6].copy_from_slice(&data[4..6]);
    bytes[4..6].reverse();
    bytes[6..8].copy_from_slice(&data[6..8]);
    bytes[6..8].reverse();
    bytes[8..].copy_from_slice(&data[8..]);

    Ok(SqlValue::Uuid(uuid::Uuid::from_bytes(bytes)))
}

fn decode_text(data: &[u8], encoding: &'static Encoding) -> Result<SqlValue, TypeError> {
    let (decoded, had_errors) = encoding.decode_without_bom_handling(data);
    if had_errors {
        return Err(TypeError::InvalidEncoding(format!(
            "column data is not valid {}",
            encoding.name()
        )));
    }
    Ok(SqlValue::String(decoded.into_owned()))
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn crack_datetime(data: &[u8]) -> Result<NaiveDateTime, TypeError> {
    let days = i32::from_le_bytes(fixed(data)?);
    let time_300ths = u32::from_le_bytes(fixed(&data[4..])?);

    let date = epoch()
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| TypeError::InvalidDateTime(format!("day offset {days} out of range")))?;

    // Convert 300ths of second to time
    let total_ms = u64::from(time_300ths) * 1000 / 300;
    let secs = u32::try_from(total_ms / 1000)
        .map_err(|_| TypeError::InvalidDateTime("invalid DATETIME time".to_string()))?;
    let nanos = ((total_ms % 1000) * 1_000_000) as u32;

    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .ok_or_else(|| TypeError::InvalidDateTime("invalid DATETIME time".to_string()))?;

    Ok(date.and_time(time))
}

fn crack_smalldatetime(data: &[u8]) -> Result<NaiveDateTime, TypeError> {
    let days = u16::from_le_bytes(fixed(data)?);
    let minutes = u16::from_le_bytes(fixed(&data[2..])?);

    let date = epoch() + Duration::days(i64::from(days));
    let time = NaiveTime::from_num_seconds_from_midnight_opt(u32::from(minutes) * 60, 0)
        .ok_or_else(|| TypeError::InvalidDateTime("invalid SMALLDATETIME time".to_string()))?;

    Ok(date.and_time(time))
}
