//! Timeframe staging: indicators, targets, and coinpair assembly.
//!
//! Every configured timeframe is run through its indicator pipeline; the
//! target timeframe additionally gets `previous_close` and the `target`
//! label. Raw price columns other than the target's are dropped before the
//! merge so only indicator columns travel across timeframes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::domain::error::QuantfoldError;
use crate::domain::indicator::shift_one;
use crate::domain::merge::merge_all;
use crate::domain::ohlcv::TimeframeSeries;
use crate::domain::pipeline::IndicatorPipeline;
use crate::domain::table::{Column, FeatureTable};
use crate::ports::data_port::SeriesSource;

pub const TARGET_COLUMN: &str = "target";
pub const PREVIOUS_CLOSE_COLUMN: &str = "previous_close";

const DROPPED_RAW_COLUMNS: [&str; 4] = ["open", "high", "low", "trades"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    /// Label is the bar's close.
    #[default]
    Price,
    /// Label is the percent change of close against the previous bar.
    RelativeReturn,
}

impl FromStr for TargetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price" => Ok(TargetMode::Price),
            "relative_return" => Ok(TargetMode::RelativeReturn),
            other => Err(format!(
                "unknown target mode '{other}' (expected price or relative_return)"
            )),
        }
    }
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetMode::Price => write!(f, "price"),
            TargetMode::RelativeReturn => write!(f, "relative_return"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub target_timeframe: u32,
    pub timeframes: Vec<u32>,
    pub target_mode: TargetMode,
    default_pipeline: IndicatorPipeline,
    overrides: BTreeMap<u32, IndicatorPipeline>,
}

impl PipelineConfig {
    pub fn new(
        target_timeframe: u32,
        timeframes: Vec<u32>,
        target_mode: TargetMode,
        default_pipeline: IndicatorPipeline,
        overrides: BTreeMap<u32, IndicatorPipeline>,
    ) -> Result<Self, QuantfoldError> {
        if timeframes.is_empty() {
            return Err(QuantfoldError::ConfigMissing {
                section: "pipeline".into(),
                key: "timeframes".into(),
            });
        }
        let mut seen = BTreeSet::new();
        for &tf in &timeframes {
            if tf == 0 {
                return Err(QuantfoldError::invalid(
                    "pipeline",
                    "timeframes",
                    "timeframes must be positive minute counts",
                ));
            }
            if !seen.insert(tf) {
                return Err(QuantfoldError::invalid(
                    "pipeline",
                    "timeframes",
                    format!("timeframe {tf} listed twice"),
                ));
            }
        }
        if !seen.contains(&target_timeframe) {
            return Err(QuantfoldError::TargetTimeframeAbsent {
                tf_minutes: target_timeframe,
            });
        }
        if let Some(tf) = overrides.keys().find(|tf| !seen.contains(*tf)) {
            return Err(QuantfoldError::invalid(
                "indicators",
                &format!("tf_{tf}"),
                "override for a timeframe that is not configured",
            ));
        }
        Ok(Self {
            target_timeframe,
            timeframes,
            target_mode,
            default_pipeline,
            overrides,
        })
    }

    pub fn pipeline_for(&self, tf_minutes: u32) -> &IndicatorPipeline {
        self.overrides
            .get(&tf_minutes)
            .unwrap_or(&self.default_pipeline)
    }
}

/// Append `previous_close` and `target`, then drop the raw close.
pub fn attach_targets(table: FeatureTable, mode: TargetMode) -> Result<FeatureTable, QuantfoldError> {
    let close = table.require_column("close")?.to_vec();
    let previous = shift_one(close.clone());

    let target = match mode {
        TargetMode::Price => close,
        TargetMode::RelativeReturn => close
            .iter()
            .zip(&previous)
            .map(|(c, p)| {
                let (c, p) = ((*c)?, (*p)?);
                Some((c - p) / p * 100.0)
            })
            .collect(),
    };

    Ok(table
        .with_column(Column::new(PREVIOUS_CLOSE_COLUMN, previous))?
        .with_column(Column::new(TARGET_COLUMN, target))?
        .drop_columns(&["close"]))
}

/// Stage one timeframe: indicators, optional targets, raw-column pruning.
pub fn process_timeframe(
    series: &TimeframeSeries,
    pipeline: &IndicatorPipeline,
    is_target: bool,
    mode: TargetMode,
) -> Result<FeatureTable, QuantfoldError> {
    let mut table = pipeline.run(series)?;
    if is_target {
        table = attach_targets(table, mode)?;
    }
    Ok(table.drop_columns(&DROPPED_RAW_COLUMNS).drop_undefined_rows())
}

/// Fetch, stage, and merge every configured timeframe of one coinpair.
/// Any timeframe failing fails the coinpair.
pub fn process_coinpair(
    source: &dyn SeriesSource,
    coin: &str,
    pair: &str,
    config: &PipelineConfig,
) -> Result<FeatureTable, QuantfoldError> {
    let mut tables = BTreeMap::new();

    for &tf in &config.timeframes {
        let series = source.fetch_series(coin, pair, tf)?;
        let is_target = tf == config.target_timeframe;
        let staged = process_timeframe(&series, config.pipeline_for(tf), is_target, config.target_mode)?;
        info!(
            coin,
            pair,
            timeframe = tf,
            bars = series.len(),
            rows = staged.len(),
            target = is_target,
            "staged timeframe"
        );
        tables.insert(tf, staged.with_label(format!("{pair} {tf}m")));
    }

    Ok(merge_all(tables, config.target_timeframe)?.with_label(pair.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{IndicatorDefinition, IndicatorKind};
    use crate::domain::ohlcv::Bar;

    fn series(tf: u32, closes: &[f64]) -> TimeframeSeries {
        let step = i64::from(tf) * 60;
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: i as i64 * step,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 5.0,
                trades: 2.0,
            })
            .collect();
        TimeframeSeries::new(tf, bars).unwrap()
    }

    fn sma_pipeline(window: usize) -> IndicatorPipeline {
        IndicatorPipeline::new(vec![IndicatorDefinition::new(IndicatorKind::Sma { window })])
            .unwrap()
    }

    #[test]
    fn target_mode_parses() {
        assert_eq!("price".parse::<TargetMode>().unwrap(), TargetMode::Price);
        assert_eq!(
            "Relative_Return".parse::<TargetMode>().unwrap(),
            TargetMode::RelativeReturn
        );
        assert!("log".parse::<TargetMode>().is_err());
    }

    #[test]
    fn attach_price_targets() {
        let table = FeatureTable::new(
            "t",
            vec![0, 60, 120],
            vec![Column::defined("close", [10.0, 11.0, 12.0])],
        )
        .unwrap();
        let table = attach_targets(table, TargetMode::Price).unwrap();
        assert_eq!(table.column_names(), vec!["previous_close", "target"]);
        assert_eq!(
            table.column("previous_close").unwrap(),
            &[None, Some(10.0), Some(11.0)]
        );
        assert_eq!(
            table.column("target").unwrap(),
            &[Some(10.0), Some(11.0), Some(12.0)]
        );
    }

    #[test]
    fn attach_relative_return_targets() {
        let table = FeatureTable::new(
            "t",
            vec![0, 60],
            vec![Column::defined("close", [100.0, 110.0])],
        )
        .unwrap();
        let table = attach_targets(table, TargetMode::RelativeReturn).unwrap();
        let target = table.column("target").unwrap();
        assert_eq!(target[0], None);
        assert!((target[1].unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn target_timeframe_columns() {
        let staged = process_timeframe(
            &series(60, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            &sma_pipeline(2),
            true,
            TargetMode::Price,
        )
        .unwrap();
        assert_eq!(
            staged.column_names(),
            vec!["volume", "sma_2", "previous_close", "target"]
        );
        // shifted SMA(2) defines from row 2; previous_close costs one more row
        assert_eq!(staged.len(), 3);
        assert_eq!(staged.column("target").unwrap()[0], Some(4.0));
        assert_eq!(staged.column("previous_close").unwrap()[0], Some(3.0));
    }

    #[test]
    fn other_timeframe_keeps_close() {
        let staged = process_timeframe(
            &series(5, &[1.0, 2.0, 3.0, 4.0]),
            &sma_pipeline(2),
            false,
            TargetMode::Price,
        )
        .unwrap();
        assert_eq!(staged.column_names(), vec!["close", "volume", "sma_2"]);
    }

    #[test]
    fn config_requires_target_in_timeframes() {
        let err = PipelineConfig::new(60, vec![5, 15], TargetMode::Price, sma_pipeline(2), BTreeMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            QuantfoldError::TargetTimeframeAbsent { tf_minutes: 60 }
        ));
    }

    #[test]
    fn config_rejects_duplicate_timeframes() {
        let err = PipelineConfig::new(5, vec![5, 5], TargetMode::Price, sma_pipeline(2), BTreeMap::new())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn config_override_selects_pipeline() {
        let mut overrides = BTreeMap::new();
        overrides.insert(15, sma_pipeline(7));
        let config =
            PipelineConfig::new(5, vec![5, 15], TargetMode::Price, sma_pipeline(2), overrides)
                .unwrap();
        assert_eq!(config.pipeline_for(15), &sma_pipeline(7));
        assert_eq!(config.pipeline_for(5), &sma_pipeline(2));
    }

    #[test]
    fn config_rejects_override_for_unknown_timeframe() {
        let mut overrides = BTreeMap::new();
        overrides.insert(240, sma_pipeline(7));
        let err = PipelineConfig::new(5, vec![5], TargetMode::Price, sma_pipeline(2), overrides)
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
