//! Technical indicator registry.
//!
//! - `IndicatorKind`: closed set of supported computations plus their parameters
//! - `IndicatorDefinition`: a kind bound to input/output column names and a shift policy
//!
//! Every computation maps `Option<f64>` input columns to equally long output
//! columns. A window touching an undefined input yields an undefined output,
//! and recursive indicators restart their warm-up after a gap.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod stddev;

use std::fmt;

use crate::domain::error::QuantfoldError;
use crate::domain::table::{Column, FeatureTable};

pub const DEFAULT_SOURCE: &str = "close";

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorKind {
    Ema { window: usize },
    Sma { window: usize },
    Rsi { window: usize },
    Bollinger { window: usize, std_dev: f64 },
    Atr { window: usize },
}

impl IndicatorKind {
    /// Registry lookup with default parameters.
    pub fn from_name(name: &str) -> Result<Self, QuantfoldError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ema" => Ok(IndicatorKind::Ema { window: 20 }),
            "sma" => Ok(IndicatorKind::Sma { window: 20 }),
            "rsi" => Ok(IndicatorKind::Rsi { window: 14 }),
            "bollinger" => Ok(IndicatorKind::Bollinger {
                window: 20,
                std_dev: 2.0,
            }),
            "atr" => Ok(IndicatorKind::Atr { window: 14 }),
            _ => Err(QuantfoldError::UnknownIndicator {
                name: name.trim().to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Ema { .. } => "ema",
            IndicatorKind::Sma { .. } => "sma",
            IndicatorKind::Rsi { .. } => "rsi",
            IndicatorKind::Bollinger { .. } => "bollinger",
            IndicatorKind::Atr { .. } => "atr",
        }
    }

    pub fn default_prefix(&self) -> &'static str {
        match self {
            IndicatorKind::Bollinger { .. } => "bb",
            other => other.name(),
        }
    }

    pub fn window(&self) -> usize {
        match self {
            IndicatorKind::Ema { window }
            | IndicatorKind::Sma { window }
            | IndicatorKind::Rsi { window }
            | IndicatorKind::Bollinger { window, .. }
            | IndicatorKind::Atr { window } => *window,
        }
    }

    pub fn set_window(&mut self, value: usize) {
        match self {
            IndicatorKind::Ema { window }
            | IndicatorKind::Sma { window }
            | IndicatorKind::Rsi { window }
            | IndicatorKind::Bollinger { window, .. }
            | IndicatorKind::Atr { window } => *window = value,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Ema { window } => write!(f, "EMA({})", window),
            IndicatorKind::Sma { window } => write!(f, "SMA({})", window),
            IndicatorKind::Rsi { window } => write!(f, "RSI({})", window),
            IndicatorKind::Bollinger { window, std_dev } => {
                write!(f, "BOLLINGER({},{})", window, std_dev)
            }
            IndicatorKind::Atr { window } => write!(f, "ATR({})", window),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorDefinition {
    pub kind: IndicatorKind,
    /// Input column. ATR additionally reads `high` and `low`.
    pub source: String,
    pub prefix: String,
    /// When set, row i carries the value computed through row i-1.
    pub historical_shift: bool,
}

impl IndicatorDefinition {
    pub fn new(kind: IndicatorKind) -> Self {
        Self {
            prefix: kind.default_prefix().to_string(),
            kind,
            source: DEFAULT_SOURCE.to_string(),
            historical_shift: true,
        }
    }

    pub fn with_shift(mut self, historical_shift: bool) -> Self {
        self.historical_shift = historical_shift;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn output_columns(&self) -> Vec<String> {
        let p = &self.prefix;
        let w = self.kind.window();
        match self.kind {
            IndicatorKind::Bollinger { .. } => vec![
                format!("{p}_mavg_{w}"),
                format!("{p}_high_{w}"),
                format!("{p}_low_{w}"),
            ],
            _ => vec![format!("{p}_{w}")],
        }
    }

    pub fn input_columns(&self) -> Vec<&str> {
        match self.kind {
            IndicatorKind::Atr { .. } => vec!["high", "low", self.source.as_str()],
            _ => vec![self.source.as_str()],
        }
    }

    /// Compute this indicator's output columns against `table`.
    pub fn compute(&self, table: &FeatureTable) -> Result<Vec<Column>, QuantfoldError> {
        let source = table.require_column(&self.source)?;
        let raw: Vec<Vec<Option<f64>>> = match self.kind {
            IndicatorKind::Ema { window } => vec![ema::calculate_ema(source, window)],
            IndicatorKind::Sma { window } => vec![sma::calculate_sma(source, window)],
            IndicatorKind::Rsi { window } => vec![rsi::calculate_rsi(source, window)],
            IndicatorKind::Bollinger { window, std_dev } => {
                let bands = bollinger::calculate_bollinger(source, window, std_dev);
                vec![bands.middle, bands.upper, bands.lower]
            }
            IndicatorKind::Atr { window } => {
                let high = table.require_column("high")?;
                let low = table.require_column("low")?;
                vec![atr::calculate_atr(high, low, source, window)]
            }
        };

        Ok(self
            .output_columns()
            .into_iter()
            .zip(raw)
            .map(|(name, values)| {
                let values = if self.historical_shift {
                    shift_one(values)
                } else {
                    values
                };
                Column::new(name, values)
            })
            .collect())
    }
}

/// Lag a series by one row; row 0 becomes undefined.
pub fn shift_one(values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    if values.is_empty() {
        return values;
    }
    let mut shifted = Vec::with_capacity(values.len());
    shifted.push(None);
    shifted.extend_from_slice(&values[..values.len() - 1]);
    shifted
}

/// Apply `f` to every full window of defined values.
pub(crate) fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut buf = Vec::with_capacity(window);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            buf.clear();
            for v in &values[i + 1 - window..=i] {
                buf.push((*v)?);
            }
            Some(f(&buf))
        })
        .collect()
}
