//! Mutable index telemetry instruments and recording helpers.

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::KeyValue;
use std::sync::OnceLock;

struct IndexInstruments {
    rows_added: Counter<u64>,
    rows_rolled_up: Counter<u64>,
    rows_rejected: Counter<u64>,
    add_duration_seconds: Histogram<f64>,
    dimensions_created: Counter<u64>,
    persist_duration_seconds: Histogram<f64>,
    persist_rows: Histogram<u64>,
}

fn instruments() -> &'static IndexInstruments {
    static INSTRUMENTS: OnceLock<IndexInstruments> = OnceLock::new();
    INSTRUMENTS.get_or_init(|| {
        let meter = global::meter("dimindex.incremental");
        IndexInstruments {
            rows_added: meter
                .u64_counter("dimindex.incremental.rows.added")
                .with_description("Rows published as new index rows")
                .init(),
            rows_rolled_up: meter
                .u64_counter("dimindex.incremental.rows.rolled_up")
                .with_description("Rows folded into an existing row by rollup")
                .init(),
            rows_rejected: meter
                .u64_counter("dimindex.incremental.rows.rejected")
                .with_description("Rows rejected at ingest, by reason")
                .init(),
            add_duration_seconds: meter
                .f64_histogram("dimindex.incremental.add.duration")
                .with_description("Time to encode and publish one row")
                .with_unit("s")
                .init(),
            dimensions_created: meter
                .u64_counter("dimindex.incremental.dimensions.created")
                .with_description("Dimension indexers created, by value type")
                .init(),
            persist_duration_seconds: meter
                .f64_histogram("dimindex.incremental.persist.duration")
                .with_description("Time to build a columnar segment")
                .with_unit("s")
                .init(),
            persist_rows: meter
                .u64_histogram("dimindex.incremental.persist.rows")
                .with_description("Rows written in each persisted segment")
                .init(),
        }
    })
}

pub fn record_add(duration_seconds: f64, rolled_up: bool) {
    let i = instruments();
    if rolled_up {
        i.rows_rolled_up.add(1, &[]);
    } else {
        i.rows_added.add(1, &[]);
    }
    i.add_duration_seconds.record(duration_seconds, &[]);
}

pub fn record_rejection(reason: &'static str) {
    instruments()
        .rows_rejected
        .add(1, &[KeyValue::new("reason", reason)]);
}

pub fn record_dimension_created(value_type: &'static str) {
    instruments()
        .dimensions_created
        .add(1, &[KeyValue::new("value_type", value_type)]);
}

pub fn record_persist(duration_seconds: f64, rows: u64) {
    let i = instruments();
    i.persist_duration_seconds.record(duration_seconds, &[]);
    i.persist_rows.record(rows, &[]);
}
