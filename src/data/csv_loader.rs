//! CSV data loading for historical company records and export of the
//! training table consumed by the external trainer

use polars::prelude::*;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::info;

use super::features::{FeatureRow, FeatureValue, UNKNOWN};
use super::schema::SchemaMetadata;
use crate::error::{PipelineError, Result};
use crate::models::{RawRecord, RawValue};

/// Label column appended to the exported training table
pub const LABEL_COLUMN: &str = "success";

/// Load every row of a historical dataset as raw records.
///
/// All columns are read as text; empty cells become nulls. Typing is left to
/// the label and feature code so that a malformed cell never fails the load.
pub fn load_raw_records<P: AsRef<Path>>(csv_path: P) -> Result<Vec<RawRecord>> {
    let path = csv_path.as_ref();
    if !path.exists() {
        return Err(PipelineError::persistence(
            path,
            io::Error::new(io::ErrorKind::NotFound, "dataset not found"),
        ));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let records = dataframe_to_records(&df)?;
    info!(
        "Loaded {} records ({} columns) from {:?}",
        records.len(),
        df.width(),
        path
    );
    Ok(records)
}

/// Convert a DataFrame to raw records, one per row
fn dataframe_to_records(df: &DataFrame) -> Result<Vec<RawRecord>> {
    let mut records = vec![RawRecord::new(); df.height()];

    for column in df.get_columns() {
        let name = column.name().to_string();
        let column = column.cast(&DataType::String)?;
        let values = column.as_materialized_series().str()?;

        for (record, value) in records.iter_mut().zip(values.into_iter()) {
            let value = match value {
                Some(v) => RawValue::Text(v.to_string()),
                None => RawValue::Null,
            };
            record.insert(name.clone(), value);
        }
    }

    Ok(records)
}

/// Build the training table: one column per feature in schema order, then
/// the integer label column
pub fn training_frame(
    rows: &[FeatureRow],
    metadata: &SchemaMetadata,
    labels: &[u8],
) -> Result<DataFrame> {
    if rows.len() != labels.len() {
        return Err(PipelineError::configuration(format!(
            "{} feature rows but {} labels",
            rows.len(),
            labels.len()
        )));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(metadata.len() + 1);

    for name in metadata.feature_order() {
        let column = if metadata.is_categorical(name) {
            let values: Vec<String> = rows
                .iter()
                .map(|row| {
                    row.get(name)
                        .and_then(FeatureValue::as_str)
                        .unwrap_or(UNKNOWN)
                        .to_string()
                })
                .collect();
            Series::new(name.as_str().into(), values)
        } else {
            let values: Vec<f64> = rows
                .iter()
                .map(|row| row.get(name).and_then(FeatureValue::as_f64).unwrap_or(0.0))
                .collect();
            Series::new(name.as_str().into(), values)
        };
        columns.push(column.into());
    }

    let label_values: Vec<i32> = labels.iter().map(|&l| i32::from(l)).collect();
    columns.push(Series::new(LABEL_COLUMN.into(), label_values).into());

    Ok(DataFrame::new(columns)?)
}

/// Write the training table as CSV
pub fn write_training_table<P: AsRef<Path>>(
    csv_path: P,
    rows: &[FeatureRow],
    metadata: &SchemaMetadata,
    labels: &[u8],
) -> Result<()> {
    let path = csv_path.as_ref();
    let mut df = training_frame(rows, metadata, labels)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::persistence(parent, e))?;
    }
    let mut file = File::create(path).map_err(|e| PipelineError::persistence(path, e))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    info!("Wrote training table ({} rows) to {:?}", df.height(), path);
    Ok(())
}
