//! Feature table CSV files.
//!
//! A header row names the columns, `timestamp` first. Undefined cells are
//! written and read as empty fields.

use std::path::Path;

use crate::domain::error::QuantfoldError;
use crate::domain::table::{FeatureTable, TIMESTAMP_COLUMN};

fn csv_error(path: &Path, err: impl ToString) -> QuantfoldError {
    QuantfoldError::Csv {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<(), QuantfoldError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    let mut header = vec![TIMESTAMP_COLUMN];
    header.extend(table.column_names());
    wtr.write_record(&header).map_err(|e| csv_error(path, e))?;

    for (row, ts) in table.timestamps().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(ts.to_string());
        record.extend(
            table
                .columns()
                .iter()
                .map(|c| c.values[row].map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(|e| csv_error(path, e))?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn read_feature_table(path: &Path) -> Result<FeatureTable, QuantfoldError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); headers.len()];

    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;
        for (i, cell) in record.iter().enumerate() {
            let cell = cell.trim();
            let value = if cell.is_empty() {
                None
            } else {
                Some(cell.parse::<f64>().map_err(|_| {
                    csv_error(
                        path,
                        format!("row {}: invalid {} value '{cell}'", line + 1, headers[i]),
                    )
                })?)
            };
            values[i].push(value);
        }
    }

    FeatureTable::from_named_columns(
        path.display().to_string(),
        headers.into_iter().zip(values).collect(),
    )
}
