//! Per-timeframe indicator pipeline.
//!
//! Definitions apply strictly left to right: an indicator may read the raw
//! bar columns or any column produced by an earlier definition. The input
//! graph is checked once in [`IndicatorPipeline::new`], so a run can only
//! fail on data, never on configuration.

use tracing::debug;

use crate::domain::error::QuantfoldError;
use crate::domain::indicator::{IndicatorDefinition, IndicatorKind};
use crate::domain::ohlcv::TimeframeSeries;
use crate::domain::table::FeatureTable;

pub const RAW_COLUMNS: [&str; 6] = ["open", "high", "low", "close", "volume", "trades"];

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPipeline {
    definitions: Vec<IndicatorDefinition>,
}

impl IndicatorPipeline {
    pub fn new(definitions: Vec<IndicatorDefinition>) -> Result<Self, QuantfoldError> {
        let mut available: Vec<String> = RAW_COLUMNS.iter().map(|c| c.to_string()).collect();

        for def in &definitions {
            if def.kind.window() == 0 {
                return Err(QuantfoldError::invalid(
                    "indicators",
                    def.kind.name(),
                    "window must be at least 1",
                ));
            }
            if let IndicatorKind::Bollinger { std_dev, .. } = def.kind {
                if !std_dev.is_finite() || std_dev < 0.0 {
                    return Err(QuantfoldError::invalid(
                        "indicators",
                        "std_dev",
                        "std_dev must be a non-negative number",
                    ));
                }
            }
            for input in def.input_columns() {
                if !available.iter().any(|c| c == input) {
                    return Err(QuantfoldError::MissingColumn {
                        table: format!("inputs of {}", def.kind),
                        column: input.to_string(),
                    });
                }
            }
            available.extend(def.output_columns());
        }

        Ok(Self { definitions })
    }

    pub fn definitions(&self) -> &[IndicatorDefinition] {
        &self.definitions
    }

    /// Append every indicator column to `table`, keeping warm-up rows.
    pub fn apply(&self, table: FeatureTable) -> Result<FeatureTable, QuantfoldError> {
        self.definitions.iter().try_fold(table, |table, def| {
            let columns = def.compute(&table)?;
            columns
                .into_iter()
                .try_fold(table, |table, column| table.with_column(column))
        })
    }

    /// Indicator table for one series with the warm-up rows removed.
    pub fn run(&self, series: &TimeframeSeries) -> Result<FeatureTable, QuantfoldError> {
        let table = self.apply(FeatureTable::from_series(series))?;
        let before = table.len();
        let table = table.drop_undefined_rows();
        debug!(
            timeframe = series.tf_minutes(),
            indicators = self.definitions.len(),
            rows_in = before,
            rows_out = table.len(),
            "indicator pipeline complete"
        );
        Ok(table)
    }
}
