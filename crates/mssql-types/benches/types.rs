//! Benchmarks for column decoding and parameter substitution.

#![allow(clippy::unwrap_used, missing_docs)]

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use mssql_types::{
    DecodeContext, FromSql, Param, Params, SqlValue, TdsDateCracker, decode_column, substitute,
};
use std::hint::black_box;
use tds_protocol::codes::{SYBDATETIME, SYBINT4, SYBNUMERIC, SYBVARCHAR};

/// Benchmark decoding of common column types.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_column");
    let cracker = TdsDateCracker;
    let ctx = DecodeContext::new(&cracker);

    let int = 42i32.to_le_bytes();
    group.bench_function("int4", |b| {
        b.iter(|| decode_column(SYBINT4, 4, Some(black_box(&int[..])), &ctx).unwrap())
    });

    let mut numeric = vec![1u8];
    numeric.extend_from_slice(&123_456_789u64.to_le_bytes());
    let numeric_ctx = ctx.with_precision_scale(18, 4);
    group.bench_function("numeric", |b| {
        b.iter(|| {
            let raw = Some(black_box(numeric.as_slice()));
            decode_column(SYBNUMERIC, numeric.len(), raw, &numeric_ctx).unwrap()
        })
    });

    let mut datetime = 45_000i32.to_le_bytes().to_vec();
    datetime.extend_from_slice(&12_345u32.to_le_bytes());
    group.bench_function("datetime", |b| {
        b.iter(|| {
            decode_column(SYBDATETIME, 8, Some(black_box(datetime.as_slice())), &ctx).unwrap()
        })
    });

    let text = "This is a typical database column value with some content";
    let text_ctx = ctx.with_encoding(Some(encoding_rs::UTF_8));
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("varchar_utf8", |b| {
        b.iter(|| {
            decode_column(SYBVARCHAR, text.len(), Some(black_box(text.as_bytes())), &text_ctx)
                .unwrap()
        })
    });

    group.finish();
}

/// Benchmark literal rendering and placeholder substitution.
fn bench_substitute(c: &mut Criterion) {
    let mut group = c.benchmark_group("substitute");

    let positional = Params::positional([
        Param::scalar(42),
        Param::scalar("O'Brien"),
        Param::list([1, 2, 3, 4, 5, 6, 7, 8]),
    ]);
    group.bench_function("positional", |b| {
        b.iter(|| {
            substitute(
                black_box("select * from t where a=%d and b=%s and c in %s"),
                &positional,
                "utf8",
            )
            .unwrap()
        })
    });

    let named = Params::named([("name", Param::scalar("x")), ("id", Param::scalar(7))]);
    group.bench_function("named", |b| {
        b.iter(|| {
            substitute(
                black_box("select * from t where name=%(name)s and id=%(id)s or id=%(id)s"),
                &named,
                "utf8",
            )
            .unwrap()
        })
    });

    group.finish();
}

/// Benchmark value extraction.
fn bench_from_sql(c: &mut Criterion) {
    let value = SqlValue::TinyInt(12);
    c.bench_function("from_sql_i64", |b| {
        b.iter(|| i64::from_sql(black_box(&value)).unwrap())
    });
}

criterion_group!(benches, bench_decode, bench_substitute, bench_from_sql);

criterion_main!(benches);
