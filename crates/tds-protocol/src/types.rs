//! TDS data type definitions.
//!
//! This module defines the Sybase/SQL Server column types as they appear in
//! the TDS protocol. The numeric values are dictated by the wire format and
//! must never change.

use crate::error::ProtocolError;

/// TDS data type identifiers.
///
/// These correspond to the type bytes reported in column metadata. The
/// DB-Library names (`SYBINT4`, `XSYBVARCHAR`, ...) are listed in the
/// [`codes`] module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    // Fixed-length types (no length prefix)
    /// Null type (`SYBVOID`).
    Null = 0x1F,
    /// 8-bit integer (`SYBINT1`).
    Int1 = 0x30,
    /// Bit (`SYBBIT`).
    Bit = 0x32,
    /// 16-bit signed integer (`SYBINT2`).
    Int2 = 0x34,
    /// 32-bit signed integer (`SYBINT4`).
    Int4 = 0x38,
    /// 64-bit signed integer (`SYBINT8`).
    Int8 = 0x7F,
    /// 32-bit floating point (`SYBREAL`).
    Float4 = 0x3B,
    /// 64-bit floating point (`SYBFLT8`).
    Float8 = 0x3E,
    /// 8-byte money (`SYBMONEY`).
    Money = 0x3C,
    /// 4-byte money (`SYBMONEY4`).
    Money4 = 0x7A,
    /// 8-byte datetime (`SYBDATETIME`).
    DateTime = 0x3D,
    /// 4-byte small datetime (`SYBDATETIME4`).
    DateTime4 = 0x3A,

    // Variable-length types (with length prefix)
    /// GUID (`SYBUNIQUE`).
    Guid = 0x24,
    /// Nullable integer (`SYBINTN`).
    IntN = 0x26,
    /// Nullable bit (`SYBBITN`).
    BitN = 0x68,
    /// Decimal (`SYBDECIMAL`).
    DecimalN = 0x6A,
    /// Numeric (`SYBNUMERIC`).
    NumericN = 0x6C,
    /// Nullable float (`SYBFLTN`).
    FloatN = 0x6D,
    /// Nullable money (`SYBMONEYN`).
    MoneyN = 0x6E,
    /// Nullable datetime (`SYBDATETIMN`).
    DateTimeN = 0x6F,

    // Byte-counted types
    /// Fixed-length character (`SYBCHAR`).
    Char = 0x2F,
    /// Variable-length character (`SYBVARCHAR`).
    VarChar = 0x27,
    /// Fixed-length binary (`SYBBINARY`).
    Binary = 0x2D,
    /// Variable-length binary (`SYBVARBINARY`).
    VarBinary = 0x25,

    // Counted types with 2-byte length
    /// Large variable-length character (`XSYBVARCHAR`).
    BigVarChar = 0xA7,
    /// Large variable-length binary (`XSYBVARBINARY`).
    BigVarBinary = 0xA5,
    /// Large fixed-length character (`XSYBCHAR`).
    BigChar = 0xAF,
    /// Large fixed-length binary (`XSYBBINARY`).
    BigBinary = 0xAD,

    // Unicode types
    /// Fixed-length Unicode character (`XSYBNCHAR`).
    NChar = 0xEF,
    /// Variable-length Unicode character (`XSYBNVARCHAR`).
    NVarChar = 0xE7,

    // Large object types
    /// Text (`SYBTEXT`).
    Text = 0x23,
    /// Image (`SYBIMAGE`).
    Image = 0x22,
    /// NText (`SYBNTEXT`).
    NText = 0x63,
}

/// DB-Library names for the wire type codes.
pub mod codes {
    #![allow(missing_docs)]

    pub const SYBVOID: u8 = 31;
    pub const SYBIMAGE: u8 = 34;
    pub const SYBTEXT: u8 = 35;
    pub const SYBUNIQUE: u8 = 36;
    pub const SYBVARBINARY: u8 = 37;
    pub const SYBINTN: u8 = 38;
    pub const SYBVARCHAR: u8 = 39;
    pub const SYBBINARY: u8 = 45;
    pub const SYBCHAR: u8 = 47;
    pub const SYBINT1: u8 = 48;
    pub const SYBBIT: u8 = 50;
    pub const SYBINT2: u8 = 52;
    pub const SYBINT4: u8 = 56;
    pub const SYBDATETIME4: u8 = 58;
    pub const SYBREAL: u8 = 59;
    pub const SYBMONEY: u8 = 60;
    pub const SYBDATETIME: u8 = 61;
    pub const SYBFLT8: u8 = 62;
    pub const SYBNTEXT: u8 = 99;
    pub const SYBBITN: u8 = 104;
    pub const SYBDECIMAL: u8 = 106;
    pub const SYBNUMERIC: u8 = 108;
    pub const SYBFLTN: u8 = 109;
    pub const SYBMONEYN: u8 = 110;
    pub const SYBDATETIMN: u8 = 111;
    pub const SYBMONEY4: u8 = 122;
    pub const SYBINT8: u8 = 127;
    pub const XSYBVARBINARY: u8 = 165;
    pub const XSYBVARCHAR: u8 = 167;
    pub const XSYBBINARY: u8 = 173;
    pub const XSYBCHAR: u8 = 175;
    pub const XSYBNVARCHAR: u8 = 231;
    pub const XSYBNCHAR: u8 = 239;

    /// Alias kept by DB-Library front ends for the nullable bit type.
    pub const SQLBITN: u8 = SYBBITN;
    /// Alias kept by DB-Library front ends for the GUID type.
    pub const SQLUUID: u8 = SYBUNIQUE;
}

impl TypeId {
    /// Create a type ID from a raw byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x1F => Some(Self::Null),
            0x30 => Some(Self::Int1),
            0x32 => Some(Self::Bit),
            0x34 => Some(Self::Int2),
            0x38 => Some(Self::Int4),
            0x7F => Some(Self::Int8),
            0x3B => Some(Self::Float4),
            0x3E => Some(Self::Float8),
            0x3C => Some(Self::Money),
            0x7A => Some(Self::Money4),
            0x3D => Some(Self::DateTime),
            0x3A => Some(Self::DateTime4),
            0x24 => Some(Self::Guid),
            0x26 => Some(Self::IntN),
            0x68 => Some(Self::BitN),
            0x6A => Some(Self::DecimalN),
            0x6C => Some(Self::NumericN),
            0x6D => Some(Self::FloatN),
            0x6E => Some(Self::MoneyN),
            0x6F => Some(Self::DateTimeN),
            0x2F => Some(Self::Char),
            0x27 => Some(Self::VarChar),
            0x2D => Some(Self::Binary),
            0x25 => Some(Self::VarBinary),
            0xA7 => Some(Self::BigVarChar),
            0xA5 => Some(Self::BigVarBinary),
            0xAF => Some(Self::BigChar),
            0xAD => Some(Self::BigBinary),
            0xEF => Some(Self::NChar),
            0xE7 => Some(Self::NVarChar),
            0x23 => Some(Self::Text),
            0x22 => Some(Self::Image),
            0x63 => Some(Self::NText),
            _ => None,
        }
    }

    /// Get the raw wire code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// DB-Library name of this type, e.g. `SYBINT4`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "SYBVOID",
            Self::Int1 => "SYBINT1",
            Self::Bit => "SYBBIT",
            Self::Int2 => "SYBINT2",
            Self::Int4 => "SYBINT4",
            Self::Int8 => "SYBINT8",
            Self::Float4 => "SYBREAL",
            Self::Float8 => "SYBFLT8",
            Self::Money => "SYBMONEY",
            Self::Money4 => "SYBMONEY4",
            Self::DateTime => "SYBDATETIME",
            Self::DateTime4 => "SYBDATETIME4",
            Self::Guid => "SYBUNIQUE",
            Self::IntN => "SYBINTN",
            Self::BitN => "SYBBITN",
            Self::DecimalN => "SYBDECIMAL",
            Self::NumericN => "SYBNUMERIC",
            Self::FloatN => "SYBFLTN",
            Self::MoneyN => "SYBMONEYN",
            Self::DateTimeN => "SYBDATETIMN",
            Self::Char => "SYBCHAR",
            Self::VarChar => "SYBVARCHAR",
            Self::Binary => "SYBBINARY",
            Self::VarBinary => "SYBVARBINARY",
            Self::BigVarChar => "XSYBVARCHAR",
            Self::BigVarBinary => "XSYBVARBINARY",
            Self::BigChar => "XSYBCHAR",
            Self::BigBinary => "XSYBBINARY",
            Self::NChar => "XSYBNCHAR",
            Self::NVarChar => "XSYBNVARCHAR",
            Self::Text => "SYBTEXT",
            Self::Image => "SYBIMAGE",
            Self::NText => "SYBNTEXT",
        }
    }

    /// Check if this is a fixed-length type.
    #[must_use]
    pub const fn is_fixed_length(&self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::Int1
                | Self::Bit
                | Self::Int2
                | Self::Int4
                | Self::Int8
                | Self::Float4
                | Self::Float8
                | Self::Money
                | Self::Money4
                | Self::DateTime
                | Self::DateTime4
        )
    }

    /// Check if this is a variable-length type.
    #[must_use]
    pub const fn is_variable_length(&self) -> bool {
        !self.is_fixed_length()
    }

    /// Check if this is a character type decoded through the session charset.
    ///
    /// The national types are included: DB-Library converts them to the
    /// client charset before handing them over.
    #[must_use]
    pub const fn is_character(&self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::VarChar
                | Self::Text
                | Self::BigChar
                | Self::BigVarChar
                | Self::NChar
                | Self::NVarChar
                | Self::NText
        )
    }

    /// Check if this is a Unicode type.
    #[must_use]
    pub const fn is_unicode(&self) -> bool {
        matches!(self, Self::NChar | Self::NVarChar | Self::NText)
    }

    /// Check if this is a date/time type.
    #[must_use]
    pub const fn is_datetime(&self) -> bool {
        matches!(self, Self::DateTime | Self::DateTime4 | Self::DateTimeN)
    }

    /// Check if this is a money type.
    #[must_use]
    pub const fn is_money(&self) -> bool {
        matches!(self, Self::Money | Self::Money4 | Self::MoneyN)
    }

    /// Get the fixed size of this type in bytes, if applicable.
    #[must_use]
    pub const fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Null => Some(0),
            Self::Int1 => Some(1),
            Self::Bit => Some(1),
            Self::Int2 => Some(2),
            Self::Int4 => Some(4),
            Self::Int8 => Some(8),
            Self::Float4 => Some(4),
            Self::Float8 => Some(8),
            Self::Money => Some(8),
            Self::Money4 => Some(4),
            Self::DateTime => Some(8),
            Self::DateTime4 => Some(4),
            Self::Guid => Some(16),
            _ => None,
        }
    }
}

impl TryFrom<u8> for TypeId {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(ProtocolError::UnknownTypeId(value))
    }
}

impl From<TypeId> for u8 {
    fn from(value: TypeId) -> Self {
        value.code()
    }
}

impl core::fmt::Display for TypeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
