//! DB-API semantic column types.
//!
//! Column headers report one of five coarse categories instead of the wire
//! type code. The numeric tags are part of the public surface and must not
//! change.

use tds_protocol::TypeId;

/// DB-API type category of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ApiType {
    /// Character data.
    String = 1,
    /// Binary data, and anything not classified otherwise.
    Binary = 2,
    /// Integer and floating point numbers.
    Number = 3,
    /// Date-time values.
    DateTime = 4,
    /// Exact decimals and money.
    Decimal = 5,
}

/// `STRING` tag.
pub const STRING: u8 = ApiType::String as u8;
/// `BINARY` tag.
pub const BINARY: u8 = ApiType::Binary as u8;
/// `NUMBER` tag.
pub const NUMBER: u8 = ApiType::Number as u8;
/// `DATETIME` tag.
pub const DATETIME: u8 = ApiType::DateTime as u8;
/// `DECIMAL` tag.
pub const DECIMAL: u8 = ApiType::Decimal as u8;

impl ApiType {
    /// Classify a wire type code. Unmatched codes are [`ApiType::Binary`].
    #[must_use]
    pub fn from_type_code(code: u8) -> Self {
        match TypeId::from_u8(code) {
            Some(
                TypeId::Bit
                | TypeId::BitN
                | TypeId::Int1
                | TypeId::Int2
                | TypeId::Int4
                | TypeId::Int8
                | TypeId::IntN
                | TypeId::Float4
                | TypeId::Float8
                | TypeId::FloatN,
            ) => Self::Number,
            Some(
                TypeId::Money
                | TypeId::Money4
                | TypeId::MoneyN
                | TypeId::NumericN
                | TypeId::DecimalN,
            ) => Self::Decimal,
            Some(TypeId::DateTime | TypeId::DateTime4 | TypeId::DateTimeN) => Self::DateTime,
            Some(TypeId::VarChar | TypeId::Char | TypeId::Text) => Self::String,
            _ => Self::Binary,
        }
    }

    /// Get the numeric tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Get the tag name, e.g. `NUMBER`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Binary => "BINARY",
            Self::Number => "NUMBER",
            Self::DateTime => "DATETIME",
            Self::Decimal => "DECIMAL",
        }
    }
}

impl From<TypeId> for ApiType {
    fn from(type_id: TypeId) -> Self {
        Self::from_type_code(type_id.code())
    }
}

impl std::fmt::Display for ApiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tds_protocol::codes::*;

    #[test]
    fn test_tags() {
        assert_eq!(STRING, 1);
        assert_eq!(BINARY, 2);
        assert_eq!(NUMBER, 3);
        assert_eq!(DATETIME, 4);
        assert_eq!(DECIMAL, 5);
    }

    #[test]
    fn test_classification() {
        for code in [SYBBIT, SYBBITN, SYBINT1, SYBINT2, SYBINT4, SYBINT8, SYBINTN] {
            assert_eq!(ApiType::from_type_code(code), ApiType::Number);
        }
        for code in [SYBREAL, SYBFLT8, SYBFLTN] {
            assert_eq!(ApiType::from_type_code(code), ApiType::Number);
        }
        for code in [SYBMONEY, SYBMONEY4, SYBMONEYN, SYBNUMERIC, SYBDECIMAL] {
            assert_eq!(ApiType::from_type_code(code), ApiType::Decimal);
        }
        for code in [SYBDATETIME, SYBDATETIME4, SYBDATETIMN] {
            assert_eq!(ApiType::from_type_code(code), ApiType::DateTime);
        }
        for code in [SYBVARCHAR, SYBCHAR, SYBTEXT] {
            assert_eq!(ApiType::from_type_code(code), ApiType::String);
        }
    }

    #[test]
    fn test_unmatched_defaults_to_binary() {
        for code in [SYBIMAGE, SYBBINARY, SYBVARBINARY, SYBUNIQUE, XSYBNVARCHAR, 0x99] {
            assert_eq!(ApiType::from_type_code(code), ApiType::Binary);
        }
    }
}
