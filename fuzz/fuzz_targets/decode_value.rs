#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mssql_types::{DecodeContext, TdsDateCracker, decode_column};

/// Column metadata for fuzzing.
#[derive(Debug, Arbitrary)]
struct FuzzColumn {
    type_code: u8,
    length: u16,
    precision: u8,
    scale: u8,
    with_charset: bool,
}

/// Fuzz input combining column metadata with raw bytes.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    column: FuzzColumn,
    data: Option<Vec<u8>>,
}

fuzz_target!(|input: FuzzInput| {
    let encoding = input.column.with_charset.then_some(encoding_rs::UTF_8);
    let ctx = DecodeContext::new(&TdsDateCracker)
        .with_encoding(encoding)
        .with_precision_scale(input.column.precision, input.column.scale);

    let _ = decode_column(
        input.column.type_code,
        usize::from(input.column.length),
        input.data.as_deref(),
        &ctx,
    );
});
