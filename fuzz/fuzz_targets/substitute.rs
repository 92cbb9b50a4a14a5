#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mssql_types::{Params, SqlValue, substitute};

/// Parameter value for fuzzing.
#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<FuzzValue> for SqlValue {
    fn from(value: FuzzValue) -> Self {
        match value {
            FuzzValue::Null => SqlValue::Null,
            FuzzValue::Int(v) => SqlValue::Int(v),
            FuzzValue::BigInt(v) => SqlValue::BigInt(v),
            FuzzValue::Double(v) => SqlValue::Double(v),
            FuzzValue::Text(v) => SqlValue::String(v),
            FuzzValue::Bytes(v) => SqlValue::from(v),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    template: String,
    positional: Vec<FuzzValue>,
    named: Vec<(String, FuzzValue)>,
    use_named: bool,
}

fuzz_target!(|input: FuzzInput| {
    let params = if input.use_named {
        Params::named(
            input
                .named
                .into_iter()
                .map(|(key, value)| (key, SqlValue::from(value))),
        )
    } else {
        Params::positional(input.positional.into_iter().map(SqlValue::from))
    };

    let Ok(sql) = substitute(&input.template, &params, "utf8") else {
        return;
    };

    // Positional placeholders hold no quotes, so every literal adds an even count.
    if !input.use_named {
        let template_quotes = input.template.matches('\'').count();
        let sql_quotes = sql.matches('\'').count();
        assert!(sql_quotes >= template_quotes);
        assert_eq!((sql_quotes - template_quotes) % 2, 0);
    }
});
