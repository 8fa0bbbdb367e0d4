//! Column-oriented feature table shared by every pipeline stage.
//!
//! Cells are `Option<f64>`; `None` marks an undefined value (warm-up, or no
//! closed source bar yet) and is never conflated with zero. Stages take a
//! table by value and hand back a new one.

use std::ops::Range;

use crate::domain::error::QuantfoldError;
use crate::domain::ohlcv::{validate_timestamps, TimeframeSeries};

pub const TIMESTAMP_COLUMN: &str = "timestamp";

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn defined(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Some).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    label: String,
    timestamps: Vec<i64>,
    columns: Vec<Column>,
}

impl FeatureTable {
    /// Build a table, checking every column matches the timestamp count and
    /// timestamps strictly increase.
    pub fn new(
        label: impl Into<String>,
        timestamps: Vec<i64>,
        columns: Vec<Column>,
    ) -> Result<Self, QuantfoldError> {
        let label = label.into();
        for column in &columns {
            if column.values.len() != timestamps.len() {
                return Err(QuantfoldError::RaggedTable {
                    column: column.name.clone(),
                    expected: timestamps.len(),
                    actual: column.values.len(),
                });
            }
        }
        validate_timestamps(timestamps.iter().copied(), &label)?;
        Ok(Self {
            label,
            timestamps,
            columns,
        })
    }

    /// Raw OHLCVT columns of a bar series, labelled by cadence.
    pub fn from_series(series: &TimeframeSeries) -> Self {
        let bars = series.bars();
        let columns = vec![
            Column::defined("open", bars.iter().map(|b| b.open)),
            Column::defined("high", bars.iter().map(|b| b.high)),
            Column::defined("low", bars.iter().map(|b| b.low)),
            Column::defined("close", bars.iter().map(|b| b.close)),
            Column::defined("volume", bars.iter().map(|b| b.volume)),
            Column::defined("trades", bars.iter().map(|b| b.trades)),
        ];
        Self {
            label: format!("{}m", series.tf_minutes()),
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            columns,
        }
    }

    /// Build from loosely-typed named columns, e.g. a table read from disk.
    /// The `timestamp` column is mandatory and must be fully defined.
    pub fn from_named_columns(
        label: impl Into<String>,
        named: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, QuantfoldError> {
        let label = label.into();
        let mut timestamps: Option<Vec<i64>> = None;
        let mut columns = Vec::with_capacity(named.len());

        for (name, values) in named {
            if name == TIMESTAMP_COLUMN {
                let mut ts = Vec::with_capacity(values.len());
                for (row, value) in values.into_iter().enumerate() {
                    match value {
                        Some(v) if v.fract() == 0.0 => ts.push(v as i64),
                        _ => {
                            return Err(QuantfoldError::Csv {
                                path: label.clone(),
                                reason: format!("row {row}: timestamp must be a whole number"),
                            });
                        }
                    }
                }
                timestamps = Some(ts);
            } else {
                columns.push(Column::new(name, values));
            }
        }

        let timestamps = timestamps.ok_or_else(|| QuantfoldError::MissingColumn {
            table: label.clone(),
            column: TIMESTAMP_COLUMN.to_string(),
        })?;
        Self::new(label, timestamps, columns)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn require_column(&self, name: &str) -> Result<&[Option<f64>], QuantfoldError> {
        self.column(name)
            .ok_or_else(|| QuantfoldError::MissingColumn {
                table: self.label.clone(),
                column: name.to_string(),
            })
    }

    /// Append a column, replacing any existing column of the same name in place.
    pub fn with_column(mut self, column: Column) -> Result<Self, QuantfoldError> {
        if column.values.len() != self.len() {
            return Err(QuantfoldError::RaggedTable {
                column: column.name,
                expected: self.len(),
                actual: column.values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }

    pub fn drop_columns(mut self, names: &[&str]) -> Self {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
        self
    }

    /// Prefix every value column; the timestamp key is left untouched.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        for column in &mut self.columns {
            column.name = format!("{prefix}{}", column.name);
        }
        self
    }

    /// Keep only rows where every column is defined.
    pub fn drop_undefined_rows(self) -> Self {
        let keep: Vec<bool> = (0..self.len())
            .map(|row| self.columns.iter().all(|c| c.values[row].is_some()))
            .collect();
        self.filter_rows(&keep)
    }

    pub fn count_undefined_rows(&self) -> usize {
        (0..self.len())
            .filter(|&row| self.columns.iter().any(|c| c.values[row].is_none()))
            .count()
    }

    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            label: self.label.clone(),
            timestamps: self.timestamps[range.clone()].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[range.clone()].to_vec()))
                .collect(),
        }
    }

    fn filter_rows(self, keep: &[bool]) -> Self {
        let timestamps = self
            .timestamps
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(t, _)| *t)
            .collect();
        let columns = self
            .columns
            .into_iter()
            .map(|c| Column {
                name: c.name,
                values: c
                    .values
                    .into_iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v)
                    .collect(),
            })
            .collect();
        Self {
            label: self.label,
            timestamps,
            columns,
        }
    }
}
