//! dimindex ingest binary
//!
//! Reads newline-delimited JSON events, feeds them through an incremental
//! index, persists the result, and prints a JSON summary.

use dimindex::incremental::{AddOutcome, IncrementalIndex, InputRow};
use dimindex::schema::DimensionsSpec;
use dimindex::telemetry::Telemetry;
use dimindex::IndexConfig;

use clap::Parser;
use serde_json::json;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::{info, warn};

/// dimindex ingest
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// NDJSON input file, stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// JSON dimensions spec file
    #[arg(long, env = "DIMINDEX_DIMENSIONS_SPEC")]
    dimensions_spec: Option<PathBuf>,

    /// Reject rows with unparseable values instead of defaulting them
    #[arg(long)]
    report_parse_failures: bool,

    /// Collapse rows with equal timestamp and dimensions
    #[arg(long)]
    rollup: bool,

    /// Row limit of the index
    #[arg(long)]
    max_rows: Option<usize>,

    /// Event key holding the row timestamp
    #[arg(long)]
    timestamp_column: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _telemetry = Telemetry::init_for_component("dimindex-ingest", &args.log_level)?;

    let mut config = IndexConfig::from_env()?;
    if let Some(path) = &args.dimensions_spec {
        config.dimensions = DimensionsSpec::from_file(path)?;
    }
    if args.report_parse_failures {
        config.report_parse_failures = true;
    }
    if args.rollup {
        config.rollup = true;
    }
    if let Some(max_rows) = args.max_rows {
        config.max_rows = max_rows;
    }
    if let Some(column) = args.timestamp_column {
        config.timestamp_column = column;
    }

    let timestamp_column = config.timestamp_column.clone();
    let index = IncrementalIndex::new(config)?;

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    info!(input = ?args.input, "Starting ingest");

    let mut read = 0u64;
    let mut added = 0u64;
    let mut rolled_up = 0u64;
    let mut rejected = 0u64;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        read += 1;

        let result = serde_json::from_str(&line)
            .map_err(dimindex::Error::from)
            .and_then(|value| InputRow::from_json(value, &timestamp_column))
            .and_then(|row| index.add(&row));

        match result {
            Ok(AddOutcome::Added { .. }) => added += 1,
            Ok(AddOutcome::RolledUp { .. }) => rolled_up += 1,
            Err(e) if e.rejects_row() || matches!(e, dimindex::Error::Serialization(_)) => {
                warn!(line = line_number + 1, error = %e, "Skipping row");
                rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let segment = index.persist()?;

    let dimensions: Vec<_> = index
        .dimension_names()
        .into_iter()
        .filter_map(|name| {
            let caps = index.capabilities(&name)?;
            Some(json!({
                "name": name,
                "type": caps.value_type.as_str(),
                "dictionaryEncoded": caps.dictionary_encoded,
                "hasBitmapIndexes": caps.has_bitmap_indexes,
                "hasMultipleValues": caps.has_multiple_values,
            }))
        })
        .collect();

    let summary = json!({
        "rowsRead": read,
        "rowsAdded": added,
        "rowsRolledUp": rolled_up,
        "rowsRejected": rejected,
        "segmentRows": segment.num_rows(),
        "columns": segment
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect::<Vec<_>>(),
        "dimensions": dimensions,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!(read, added, rolled_up, rejected, "Ingest complete");
    Ok(())
}
