//! TDS protocol version definitions.
//!
//! DB-Library style transports take the version as a packed `major.minor`
//! value (`0x701` for TDS 7.1). Only the versions listed here can be
//! requested; anything else is rejected before a connection is attempted.

use core::fmt;
use core::str::FromStr;

use crate::error::ProtocolError;

/// TDS protocol version requested at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TdsVersion(u16);

impl TdsVersion {
    /// TDS 4.2 (SQL Server 4.x, early Sybase)
    pub const V4_2: Self = Self(0x402);

    /// TDS 5.0 (Sybase)
    pub const V5_0: Self = Self(0x500);

    /// TDS 7.0 (SQL Server 7.0)
    pub const V7_0: Self = Self(0x700);

    /// TDS 7.1 (SQL Server 2000)
    pub const V7_1: Self = Self(0x701);

    /// TDS 7.2 (SQL Server 2005)
    pub const V7_2: Self = Self(0x702);

    /// TDS 7.3 (SQL Server 2008)
    pub const V7_3: Self = Self(0x703);

    /// TDS 7.4 (SQL Server 2012+)
    pub const V7_4: Self = Self(0x704);

    /// Every version that may be requested, oldest first.
    pub const SUPPORTED: [Self; 7] = [
        Self::V4_2,
        Self::V5_0,
        Self::V7_0,
        Self::V7_1,
        Self::V7_2,
        Self::V7_3,
        Self::V7_4,
    ];

    /// Get the raw packed version value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Get the major version number.
    #[must_use]
    pub const fn major(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Get the minor version number.
    #[must_use]
    pub const fn minor(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Check if this is a Sybase-era version (before TDS 7.0).
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        self.0 < Self::V7_0.0
    }

    /// Parse a TDS version from its dotted string form.
    ///
    /// Accepts exactly `4.2`, `5.0`, `7.0`, `7.1`, `7.2`, `7.3` and `7.4`,
    /// ignoring surrounding whitespace. Returns None otherwise.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "4.2" => Some(Self::V4_2),
            "5.0" => Some(Self::V5_0),
            "7.0" => Some(Self::V7_0),
            "7.1" => Some(Self::V7_1),
            "7.2" => Some(Self::V7_2),
            "7.3" => Some(Self::V7_3),
            "7.4" => Some(Self::V7_4),
            _ => None,
        }
    }
}

impl Default for TdsVersion {
    fn default() -> Self {
        Self::V7_1
    }
}

impl FromStr for TdsVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ProtocolError::UnknownVersion(s.to_string()))
    }
}

impl fmt::Display for TdsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

impl From<TdsVersion> for u16 {
    fn from(version: TdsVersion) -> Self {
        version.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_version_table() {
        assert_eq!(TdsVersion::parse("4.2").unwrap().raw(), 0x402);
        assert_eq!(TdsVersion::parse("5.0").unwrap().raw(), 0x500);
        assert_eq!(TdsVersion::parse("7.0").unwrap().raw(), 0x700);
        assert_eq!(TdsVersion::parse("7.1").unwrap().raw(), 0x701);
        assert_eq!(TdsVersion::parse("7.2").unwrap().raw(), 0x702);
        assert_eq!(TdsVersion::parse("7.3").unwrap().raw(), 0x703);
        assert_eq!(TdsVersion::parse(" 7.4 ").unwrap().raw(), 0x704);
    }

    #[test]
    fn test_unknown_version_rejected() {
        assert!(TdsVersion::parse("8.0").is_none());
        assert!(TdsVersion::parse("7").is_none());
        assert!(TdsVersion::parse("").is_none());

        let err = "6.0".parse::<TdsVersion>().unwrap_err();
        assert_eq!(err, ProtocolError::UnknownVersion("6.0".into()));
    }

    #[test]
    fn test_version_comparison() {
        assert!(TdsVersion::V7_4 > TdsVersion::V7_3);
        assert!(TdsVersion::V7_0 > TdsVersion::V5_0);
        assert!(TdsVersion::V5_0.is_legacy());
        assert!(!TdsVersion::V7_0.is_legacy());
    }

    #[test]
    fn test_display_round_trips() {
        for version in TdsVersion::SUPPORTED {
            assert_eq!(TdsVersion::parse(&version.to_string()), Some(version));
        }
        assert_eq!(TdsVersion::default().to_string(), "7.1");
    }
}
