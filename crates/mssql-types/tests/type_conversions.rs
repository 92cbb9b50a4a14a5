//! Conversion and quoting edge case tests.
//!
//! Tests edge cases for:
//! - NULL handling through decode, extraction and quoting
//! - Charset boundaries in both directions
//! - Integer and decimal boundaries

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::Bytes;
use mssql_types::{
    ApiType, DecodeContext, FromSql, Param, Params, SqlValue, TdsDateCracker, TypeError,
    decode_column, render_literal, substitute,
};
use rust_decimal::Decimal;
use tds_protocol::codes::*;

fn ctx() -> DecodeContext<'static> {
    DecodeContext::new(&TdsDateCracker)
}

// ============================================================================
// NULL Handling Edge Cases
// ============================================================================

mod null_handling {
    use super::*;

    #[test]
    fn test_null_column_extracts_as_none() {
        let value = decode_column(SYBINTN, 4, None, &ctx()).unwrap();
        assert_eq!(Option::<i32>::from_sql(&value).unwrap(), None);
    }

    #[test]
    fn test_null_column_to_non_option_fails() {
        let value = decode_column(SYBVARCHAR, 10, None, &ctx()).unwrap();
        assert!(matches!(
            String::from_sql(&value),
            Err(TypeError::UnexpectedNull)
        ));
    }

    #[test]
    fn test_null_parameter_renders_keyword() {
        let sql = substitute(
            "update t set a=%s where b=%(b)s",
            &Params::positional([Param::scalar(SqlValue::Null)]),
            "utf8",
        )
        .unwrap();
        assert_eq!(sql, "update t set a=NULL where b=%(b)s");
    }

    #[test]
    fn test_option_parameter() {
        let none: Option<i32> = None;
        assert_eq!(render_literal(&none.into(), "utf8").unwrap(), "NULL");
        assert_eq!(render_literal(&Some(5).into(), "utf8").unwrap(), "5");
    }
}

// ============================================================================
// Charset Boundaries
// ============================================================================

mod charsets {
    use super::*;

    #[test]
    fn test_multibyte_round_trip_through_literal() {
        let text = "日本語テスト";
        let literal = render_literal(&text.into(), "utf8").unwrap();
        assert_eq!(literal, format!("N'{text}'"));
    }

    #[test]
    fn test_latin1_column_decoding() {
        let ctx = ctx().with_encoding(Some(encoding_rs::WINDOWS_1252));
        let value = decode_column(SYBCHAR, 5, Some(b"na\xefve"), &ctx).unwrap();
        assert_eq!(value.as_str(), Some("naïve"));
    }

    #[test]
    fn test_bytes_with_high_bit_render_as_hex() {
        let literal = render_literal(&SqlValue::Binary(Bytes::from_static(b"na\xefve")), "utf8")
            .unwrap();
        assert_eq!(literal, "0x6e61ef7665");
    }

    #[test]
    fn test_bytes_with_nul_render_as_hex() {
        let literal =
            render_literal(&SqlValue::Binary(Bytes::from_static(b"a\0b")), "utf8").unwrap();
        assert_eq!(literal, "0x610062");
    }
}

// ============================================================================
// Numeric Boundaries
// ============================================================================

mod boundaries {
    use super::*;

    #[test]
    fn test_tinyint_is_signed() {
        let value = decode_column(SYBINT1, 1, Some(&[0xFF]), &ctx()).unwrap();
        assert_eq!(value, SqlValue::TinyInt(-1));
        assert_eq!(i64::from_sql(&value).unwrap(), -1);

        let value = decode_column(SYBINTN, 1, Some(&[0x80]), &ctx()).unwrap();
        assert_eq!(value, SqlValue::TinyInt(i8::MIN));
        assert_eq!(i8::from_sql(&value).unwrap(), i8::MIN);
    }

    #[test]
    fn test_bigint_extremes() {
        for v in [i64::MIN, i64::MAX] {
            let value = decode_column(SYBINT8, 8, Some(&v.to_le_bytes()), &ctx()).unwrap();
            assert_eq!(render_literal(&value, "utf8").unwrap(), v.to_string());
        }
    }

    #[test]
    fn test_smallmoney_extremes() {
        let value = decode_column(SYBMONEY4, 4, Some(&i32::MIN.to_le_bytes()), &ctx()).unwrap();
        assert_eq!(value, SqlValue::Decimal(Decimal::new(i64::from(i32::MIN), 4)));
        assert_eq!(render_literal(&value, "utf8").unwrap(), "-214748.3648");
    }

    #[test]
    fn test_numeric_overflowing_decimal_is_rejected() {
        let mut data = vec![1u8];
        data.extend_from_slice(&u128::MAX.to_le_bytes());
        let err = decode_column(SYBNUMERIC, data.len(), Some(&data), &ctx()).unwrap_err();
        assert!(matches!(err, TypeError::InvalidDecimal(_)));
    }

    #[test]
    fn test_api_type_of_every_numeric_code() {
        for code in [SYBINT1, SYBINT2, SYBINT4, SYBINT8, SYBINTN, SYBREAL, SYBFLT8, SYBFLTN] {
            assert_eq!(ApiType::from_type_code(code).tag(), 3);
        }
    }
}
