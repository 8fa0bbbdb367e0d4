//! Run configuration: parsing and eager validation.
//!
//! Everything a run needs is read once into [`RunConfig`]; every error is
//! raised here, before any series is fetched.
//!
//! Indicator lists are `|`-separated items of the form
//! `name[:key=value[,key=value]*]`, e.g. `ema:window=12 | bollinger:window=20,std_dev=2.5`.

use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::QuantfoldError;
use crate::domain::fold::FoldConfig;
use crate::domain::indicator::{IndicatorDefinition, IndicatorKind};
use crate::domain::metrics::SummaryField;
use crate::domain::pipeline::IndicatorPipeline;
use crate::domain::staging::{PipelineConfig, TargetMode};
use crate::ports::config_port::ConfigPort;

const DEFAULT_LIST_KEY: &str = "default";
const OVERRIDE_PREFIX: &str = "tf_";

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub pipeline: PipelineConfig,
    pub folds: FoldConfig,
    pub backtest: BacktestConfig,
    pub holdout_frac: f64,
    pub objective: SummaryField,
}

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, QuantfoldError> {
    let pipeline = load_pipeline_config(config)?;
    let folds = load_fold_config(config)?;
    let backtest = load_backtest_config(config)?;

    let holdout_frac = config.get_double("folds", "holdout_frac", 0.0)?;
    if !(0.0..1.0).contains(&holdout_frac) {
        return Err(QuantfoldError::invalid(
            "folds",
            "holdout_frac",
            format!("must be in [0, 1), got {holdout_frac}"),
        ));
    }

    let objective = match config.get_string("folds", "objective") {
        Some(raw) => raw
            .parse::<SummaryField>()
            .map_err(|reason| QuantfoldError::invalid("folds", "objective", reason))?,
        None => SummaryField::default(),
    };

    Ok(RunConfig {
        pipeline,
        folds,
        backtest,
        holdout_frac,
        objective,
    })
}

pub fn load_pipeline_config(config: &dyn ConfigPort) -> Result<PipelineConfig, QuantfoldError> {
    let target_timeframe = parse_timeframe(
        "pipeline",
        "target_timeframe",
        &required(config, "pipeline", "target_timeframe")?,
    )?;
    let timeframes = required(config, "pipeline", "timeframes")?
        .split(',')
        .map(|tf| parse_timeframe("pipeline", "timeframes", tf))
        .collect::<Result<Vec<_>, _>>()?;
    let historical_shift = config.get_bool("pipeline", "historical_shift", true)?;
    let target_mode = match config.get_string("pipeline", "target_mode") {
        Some(raw) => raw
            .parse::<TargetMode>()
            .map_err(|reason| QuantfoldError::invalid("pipeline", "target_mode", reason))?,
        None => TargetMode::default(),
    };

    let mut default_pipeline = None;
    let mut overrides = BTreeMap::new();
    for key in config.keys("indicators") {
        let list = config.get_string("indicators", &key).unwrap_or_default();
        let pipeline = IndicatorPipeline::new(parse_indicator_list(&list, historical_shift)?)?;
        if key == DEFAULT_LIST_KEY {
            default_pipeline = Some(pipeline);
        } else if let Some(tf) = key.strip_prefix(OVERRIDE_PREFIX) {
            overrides.insert(parse_timeframe("indicators", &key, tf)?, pipeline);
        } else {
            return Err(QuantfoldError::invalid(
                "indicators",
                &key,
                "expected 'default' or 'tf_<minutes>'",
            ));
        }
    }

    let default_pipeline = match default_pipeline {
        Some(p) => p,
        None => {
            warn!("no [indicators] default list; timeframes without an override get raw columns only");
            IndicatorPipeline::new(Vec::new())?
        }
    };

    PipelineConfig::new(
        target_timeframe,
        timeframes,
        target_mode,
        default_pipeline,
        overrides,
    )
}

pub fn load_fold_config(config: &dyn ConfigPort) -> Result<FoldConfig, QuantfoldError> {
    let defaults = FoldConfig::default();
    let n_folds = config.get_int("folds", "n_folds", defaults.n_folds as i64)?;
    let folds = FoldConfig {
        n_folds: usize::try_from(n_folds).map_err(|_| {
            QuantfoldError::invalid("folds", "n_folds", format!("must be at least 1, got {n_folds}"))
        })?,
        initial_train_frac: config.get_double(
            "folds",
            "initial_train_frac",
            defaults.initial_train_frac,
        )?,
        val_frac: config.get_double("folds", "val_frac", defaults.val_frac)?,
        emit_validation: config.get_bool("folds", "emit_validation", defaults.emit_validation)?,
    };
    folds.validate()?;
    Ok(folds)
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, QuantfoldError> {
    let defaults = BacktestConfig::default();
    let backtest = BacktestConfig {
        initial_balance: config.get_double("backtest", "initial_balance", defaults.initial_balance)?,
        percent_to_buy: config.get_double("backtest", "percent_to_buy", defaults.percent_to_buy)?,
        fee_rate: config.get_double("backtest", "fee_rate", defaults.fee_rate)?,
        slippage_rate: config.get_double("backtest", "slippage_rate", defaults.slippage_rate)?,
    };
    backtest.validate()?;
    Ok(backtest)
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, QuantfoldError> {
    config
        .get_string(section, key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| QuantfoldError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn parse_timeframe(section: &str, key: &str, raw: &str) -> Result<u32, QuantfoldError> {
    match raw.trim().parse::<u32>() {
        Ok(tf) if tf > 0 => Ok(tf),
        _ => Err(QuantfoldError::invalid(
            section,
            key,
            format!("'{}' is not a positive minute count", raw.trim()),
        )),
    }
}

/// Parse a `|`-separated indicator list. Empty items are ignored.
pub fn parse_indicator_list(
    list: &str,
    historical_shift: bool,
) -> Result<Vec<IndicatorDefinition>, QuantfoldError> {
    list.split('|')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_indicator(item, historical_shift))
        .collect()
}

/// Parse one `name[:key=value,...]` item.
pub fn parse_indicator(
    item: &str,
    historical_shift: bool,
) -> Result<IndicatorDefinition, QuantfoldError> {
    let (name, params) = match item.split_once(':') {
        Some((name, params)) => (name, params),
        None => (item, ""),
    };
    let mut kind = IndicatorKind::from_name(name)?;
    let key_context = kind.name();

    let mut source = None;
    let mut prefix = None;
    let mut shift = historical_shift;

    for pair in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            QuantfoldError::invalid("indicators", key_context, format!("expected key=value, got '{pair}'"))
        })?;
        let (key, value) = (key.trim(), value.trim());
        let bad_value = |expected: &str| {
            QuantfoldError::invalid(
                "indicators",
                key_context,
                format!("{key} expects {expected}, got '{value}'"),
            )
        };

        match key {
            "window" => {
                let window: usize = value.parse().map_err(|_| bad_value("a whole number"))?;
                if window == 0 {
                    return Err(bad_value("a window of at least 1"));
                }
                kind.set_window(window);
            }
            "std_dev" => match kind {
                IndicatorKind::Bollinger { ref mut std_dev, .. } => {
                    *std_dev = value.parse().map_err(|_| bad_value("a number"))?;
                }
                _ => {
                    return Err(QuantfoldError::invalid(
                        "indicators",
                        key_context,
                        "std_dev only applies to bollinger",
                    ));
                }
            },
            "source" if !value.is_empty() => source = Some(value.to_string()),
            "prefix" if !value.is_empty() => prefix = Some(value.to_string()),
            "shift" => {
                shift = match value.to_ascii_lowercase().as_str() {
                    "true" | "yes" | "1" => true,
                    "false" | "no" | "0" => false,
                    _ => return Err(bad_value("a boolean")),
                };
            }
            "source" | "prefix" => return Err(bad_value("a column name")),
            other => {
                return Err(QuantfoldError::invalid(
                    "indicators",
                    key_context,
                    format!("unknown parameter '{other}'"),
                ));
            }
        }
    }

    let mut definition = IndicatorDefinition::new(kind).with_shift(shift);
    if let Some(source) = source {
        definition = definition.with_source(source);
    }
    if let Some(prefix) = prefix {
        definition = definition.with_prefix(prefix);
    }
    Ok(definition)
}
