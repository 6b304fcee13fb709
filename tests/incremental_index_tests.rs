//! End-to-end tests for the incremental index
//!
//! These tests drive ingest through the public index API:
//! - Dimension discovery and rows that predate a dimension
//! - Rollup with null and zero collapsing together
//! - Sorted cursors and selectors bound to them
//! - Persisting into a columnar segment
//! - Reads and persists concurrent with ingest

use dimindex::incremental::{AddOutcome, CursorOrder, IncrementalIndex, InputRow};
use dimindex::schema::{DimensionSchema, DimensionsSpec, ValueType, COUNT_FIELD, TIME_FIELD};
use dimindex::selector::{DimensionSpec, ExtractionFn};
use dimindex::value::ActualValue;
use dimindex::{Error, IndexConfig};

use arrow_array::{Array, DictionaryArray, Float32Array, Int64Array, StringArray, UInt64Array};
use arrow_array::types::UInt32Type;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn declared(dims: &[DimensionSchema]) -> IndexConfig {
    let mut builder = DimensionsSpec::builder();
    for dim in dims {
        builder = builder.with_dimension(dim.clone());
    }
    IndexConfig::default().with_dimensions(builder.build().unwrap())
}

// =========================================================================
// Ingest
// =========================================================================

#[test]
fn test_numeric_column_scenario() {
    let index = IncrementalIndex::new(declared(&[DimensionSchema::float("price")])).unwrap();

    index.add(&InputRow::new(1).with("price", Option::<f64>::None)).unwrap();
    index.add(&InputRow::new(2).with("price", "3.5")).unwrap();
    index.add(&InputRow::new(3).with("price", 2.0)).unwrap();
    let err = index
        .add(&InputRow::new(4).with("price", vec![1i64, 2]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidShape(_)));

    let cursor = index.cursor(CursorOrder::Insertion);
    let selector = index.make_column_value_selector(&cursor, "price").unwrap();
    let mut values = Vec::new();
    while !cursor.is_done() {
        values.push(selector.get_float());
        cursor.advance();
    }
    assert_eq!(values, vec![0.0, 3.5, 2.0]);
}

#[test]
fn test_report_parse_failures_rejects_row() {
    let config = declared(&[DimensionSchema::double("latency")]).with_report_parse_failures(true);
    let index = IncrementalIndex::new(config).unwrap();

    let err = index
        .add(&InputRow::new(1).with("latency", "slow").with("host", "a"))
        .unwrap_err();
    assert!(matches!(err, Error::ParseFailure(ref msg) if msg.contains("latency")));
    assert!(index.is_empty());

    index.add(&InputRow::new(1).with("latency", "12.5")).unwrap();
    assert_eq!(index.row_count(), 1);
}

#[test]
fn test_rows_before_discovery_read_defaults() {
    let index = IncrementalIndex::new(declared(&[DimensionSchema::long("bytes")])).unwrap();

    index.add(&InputRow::new(1).with("bytes", 10)).unwrap();
    index
        .add(&InputRow::new(2).with("bytes", 20).with("host", "web-1"))
        .unwrap();

    assert_eq!(index.dimension_names(), vec!["bytes", "host"]);

    let cursor = index.cursor(CursorOrder::Insertion);
    let host = index
        .make_dimension_selector(&cursor, &DimensionSpec::new("host"))
        .unwrap();
    let bytes = index.make_column_value_selector(&cursor, "bytes").unwrap();

    assert_eq!(host.row_values(), vec![None]);
    assert_eq!(bytes.get_long(), 10);

    cursor.advance();
    assert_eq!(host.row_values(), vec![Some("web-1".to_string())]);
    assert_eq!(bytes.get_object(), Some(ActualValue::Long(20)));
}

#[test]
fn test_undiscovered_keys_are_dropped() {
    let mut config = declared(&[DimensionSchema::string("host")]);
    config.discover_dimensions = false;
    let index = IncrementalIndex::new(config).unwrap();
    index.add(&InputRow::new(1).with("host", "a").with("price", 9.0)).unwrap();

    assert!(index.dimension("price").is_none());
    let cursor = index.cursor(CursorOrder::Insertion);
    assert!(matches!(
        index.make_column_value_selector(&cursor, "price"),
        Err(Error::UnknownDimension(_))
    ));
}

#[test]
fn test_row_limit() {
    let index = IncrementalIndex::new(IndexConfig::default().with_max_rows(2)).unwrap();
    index.add(&InputRow::new(1)).unwrap();
    index.add(&InputRow::new(2)).unwrap();
    assert!(matches!(
        index.add(&InputRow::new(3)),
        Err(Error::IndexFull { max_rows: 2 })
    ));

    assert!(matches!(
        IncrementalIndex::new(IndexConfig::default().with_max_rows(0)),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_float_strings_keep_nearest_float() {
    // just above the midpoint of 1.0 and 1.0000001
    let text = "1.0000000596046447753906251";
    let index = IncrementalIndex::new(declared(&[DimensionSchema::float("price")])).unwrap();
    index.add(&InputRow::new(1).with("price", text)).unwrap();
    index.add(&InputRow::new(2).with("label", text)).unwrap();

    let cursor = index.cursor(CursorOrder::Insertion);
    let price = index.make_column_value_selector(&cursor, "price").unwrap();
    assert_eq!(price.get_float().to_bits(), 0x3f80_0001);
    assert_eq!(price.get_object(), Some(ActualValue::Float(f32::from_bits(0x3f80_0001))));

    cursor.advance();
    let label = index.make_column_value_selector(&cursor, "label").unwrap();
    assert_eq!(label.get_float().to_bits(), 0x3f80_0001);

    let segment = index.persist().unwrap();
    let column = segment
        .batch()
        .column_by_name("price")
        .unwrap()
        .as_any()
        .downcast_ref::<Float32Array>()
        .unwrap();
    assert_eq!(column.value(0).to_bits(), 0x3f80_0001);
}

// =========================================================================
// Rollup
// =========================================================================

#[test]
fn test_rollup_collapses_null_and_zero() {
    let config = declared(&[DimensionSchema::float("price"), DimensionSchema::string("host")])
        .with_rollup(true);
    let index = IncrementalIndex::new(config).unwrap();

    let first = index.add(&InputRow::new(10).with("host", "a")).unwrap();
    let second = index
        .add(&InputRow::new(10).with("host", "a").with("price", 0.0))
        .unwrap();
    let third = index
        .add(&InputRow::new(10).with("host", "a").with("price", "garbage"))
        .unwrap();
    let other = index
        .add(&InputRow::new(10).with("host", "b").with("price", 0.0))
        .unwrap();

    assert_eq!(first, AddOutcome::Added { row_number: 0 });
    assert_eq!(second, AddOutcome::RolledUp { row_number: 0 });
    assert_eq!(third, AddOutcome::RolledUp { row_number: 0 });
    assert_eq!(other, AddOutcome::Added { row_number: 1 });
    assert_eq!(index.row_count(), 2);
    assert_eq!(index.ingested_count(), 4);
}

// =========================================================================
// Cursors and selectors
// =========================================================================

#[test]
fn test_sorted_cursor_orders_by_time_then_dimensions() {
    let index = IncrementalIndex::new(declared(&[DimensionSchema::float("price")])).unwrap();
    for (ts, price) in [(2, 1.0), (1, 5.0), (2, -1.0), (1, 0.5)] {
        index.add(&InputRow::new(ts).with("price", price)).unwrap();
    }

    let cursor = index.cursor(CursorOrder::Sorted);
    let selector = index.make_column_value_selector(&cursor, "price").unwrap();
    let mut seen = Vec::new();
    while let Some(row) = cursor.current() {
        seen.push((row.timestamp(), selector.get_float()));
        cursor.advance();
    }
    assert_eq!(seen, vec![(1, 0.5), (1, 5.0), (2, -1.0), (2, 1.0)]);
}

#[test]
fn test_string_selector_with_extraction_and_multi_values() {
    let index = IncrementalIndex::new(IndexConfig::default()).unwrap();
    index
        .add(&InputRow::new(1).with("tags", vec!["Red", "Blue"]))
        .unwrap();

    let caps = index.capabilities("tags").unwrap();
    assert_eq!(caps.value_type, ValueType::String);
    assert!(caps.has_multiple_values);
    assert!(caps.dictionary_encoded);

    let cursor = index.cursor(CursorOrder::Insertion);
    let spec = DimensionSpec::new("tags")
        .with_output_name("tag")
        .with_extraction_fn(ExtractionFn::Lower);
    let selector = index.make_dimension_selector(&cursor, &spec).unwrap();

    assert_eq!(spec.output_name(), "tag");
    assert_eq!(
        selector.row_values(),
        vec![Some("red".to_string()), Some("blue".to_string())]
    );
    assert!(selector.matches(Some("blue")));
}

#[test]
fn test_cursor_is_a_snapshot() {
    let index = IncrementalIndex::new(IndexConfig::default()).unwrap();
    index.add(&InputRow::new(1)).unwrap();
    let cursor = index.cursor(CursorOrder::Insertion);
    index.add(&InputRow::new(2)).unwrap();

    assert_eq!(cursor.len(), 1);
    assert_eq!(index.row_count(), 2);
}

// =========================================================================
// Persist
// =========================================================================

#[test]
fn test_persist_segment_columns_and_bitmaps() {
    let config = declared(&[DimensionSchema::float("price"), DimensionSchema::long("bytes")])
        .with_rollup(true);
    let index = IncrementalIndex::new(config).unwrap();

    let events = [
        json!({"timestamp": 2, "price": "1.5", "bytes": 7, "host": "b"}),
        json!({"timestamp": 1, "price": null, "bytes": 3}),
        json!({"timestamp": 2, "price": 1.5, "bytes": 7, "host": "b"}),
        json!({"timestamp": 3, "price": 4, "host": "a"}),
    ];
    for event in events {
        let row = InputRow::from_json(event, "timestamp").unwrap();
        index.add(&row).unwrap();
    }

    let segment = index.persist().unwrap();
    let batch = segment.batch();
    assert_eq!(segment.num_rows(), 3);

    let names: Vec<_> = segment
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(names, vec![TIME_FIELD, "price", "bytes", "host", COUNT_FIELD]);

    let price = batch
        .column_by_name("price")
        .unwrap()
        .as_any()
        .downcast_ref::<Float32Array>()
        .unwrap();
    assert_eq!(price.values().to_vec(), vec![0.0, 1.5, 4.0]);

    let bytes = batch
        .column_by_name("bytes")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(bytes.values().to_vec(), vec![3, 7, 0]);

    let host = batch
        .column_by_name("host")
        .unwrap()
        .as_any()
        .downcast_ref::<DictionaryArray<UInt32Type>>()
        .unwrap();
    let dictionary = host.values().as_any().downcast_ref::<StringArray>().unwrap();
    assert!(dictionary.is_null(0));
    assert_eq!(dictionary.value(1), "a");
    assert_eq!(dictionary.value(2), "b");
    assert_eq!(host.keys().values().to_vec(), vec![0, 2, 1]);

    let count = batch
        .column_by_name(COUNT_FIELD)
        .unwrap()
        .as_any()
        .downcast_ref::<UInt64Array>()
        .unwrap();
    assert_eq!(count.values().to_vec(), vec![1, 2, 1]);

    assert_eq!(segment.bitmap("host", None).unwrap().iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(segment.bitmap("host", Some("a")).unwrap().iter().collect::<Vec<_>>(), vec![2]);
    assert!(segment.bitmap("host", Some("zzz")).is_none());
    assert!(segment.bitmap("price", None).is_none());
}

// =========================================================================
// Concurrency
// =========================================================================

#[test]
fn test_concurrent_ingest_and_reads() {
    let config = declared(&[DimensionSchema::double("value")]);
    let index = Arc::new(IncrementalIndex::new(config).unwrap());

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for i in 0..250 {
                    let row = InputRow::new(i)
                        .with("value", (w * 1000 + i) as f64)
                        .with(format!("dim_{}", w), "x");
                    index.add(&row).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for _ in 0..20 {
                let cursor = index.cursor(CursorOrder::Insertion);
                let selector = index.make_column_value_selector(&cursor, "value").unwrap();
                let mut seen = 0;
                while !cursor.is_done() {
                    assert!(selector.get_double() >= 0.0);
                    seen += 1;
                    cursor.advance();
                }
                assert_eq!(seen, cursor.len());
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(index.row_count(), 1000);
    assert_eq!(index.dimension_names().len(), 5);

    let cursor = index.cursor(CursorOrder::Insertion);
    for w in 0..4 {
        let selector = index
            .make_dimension_selector(&cursor, &DimensionSpec::new(format!("dim_{}", w)))
            .unwrap();
        assert!(selector.value_cardinality().known().unwrap() >= 1);
    }
}

#[test]
fn test_persist_during_ingest_keeps_strings() {
    let index = Arc::new(IncrementalIndex::new(IndexConfig::default()).unwrap());
    for t in 0..2000i64 {
        index
            .add(&InputRow::new(t).with("host", format!("m{:05}", t)))
            .unwrap();
    }

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let index = Arc::clone(&index);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut written = 0i64;
            // lexically smaller hosts shift every existing rank
            while written < 200_000 && !stop.load(Ordering::Relaxed) {
                let row = InputRow::new(1_000_000 + written)
                    .with("host", format!("a{}", 99_999_999 - written));
                index.add(&row).unwrap();
                written += 1;
            }
            written
        })
    };

    for _ in 0..5 {
        let segment = index.persist().unwrap();
        let host = segment
            .batch()
            .column_by_name("host")
            .unwrap()
            .as_any()
            .downcast_ref::<DictionaryArray<UInt32Type>>()
            .unwrap();
        let values = host.values().as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(values.len(), segment.dictionary("host").unwrap().len());

        for t in 0..2000usize {
            let rank = host.keys().value(t) as usize;
            assert_eq!(values.value(rank), format!("m{:05}", t), "row {t}");
        }
        assert_eq!(
            segment.bitmap("host", Some("m00000")).unwrap().iter().collect::<Vec<_>>(),
            vec![0]
        );
        assert_eq!(
            segment.bitmap("host", Some("m01999")).unwrap().iter().collect::<Vec<_>>(),
            vec![1999]
        );
    }

    stop.store(true, Ordering::Relaxed);
    let written = writer.join().unwrap();
    assert_eq!(index.row_count(), 2000 + written as usize);
}
