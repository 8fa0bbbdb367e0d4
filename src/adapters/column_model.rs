//! Baseline model: predict the value of one feature column.
//!
//! Useful as a sanity check for the simulator and as a floor for real
//! models. An undefined cell predicts NaN, which never triggers a buy.

use crate::domain::error::QuantfoldError;
use crate::domain::fold::Segment;
use crate::ports::model_port::{ModelTrainer, PricePredictor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPredictor {
    index: usize,
}

impl ColumnPredictor {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl PricePredictor for ColumnPredictor {
    fn predict(&self, features: &[Option<f64>]) -> f64 {
        features
            .get(self.index)
            .copied()
            .flatten()
            .unwrap_or(f64::NAN)
    }
}

/// "Fits" a [`ColumnPredictor`] by resolving the column in each training
/// segment's feature order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTrainer {
    column: String,
}

impl ColumnTrainer {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl ModelTrainer for ColumnTrainer {
    type Model = ColumnPredictor;

    fn fit(&self, train: &Segment, _validate: Option<&Segment>) -> Result<ColumnPredictor, QuantfoldError> {
        train
            .feature_index(&self.column)
            .map(ColumnPredictor::new)
            .ok_or_else(|| QuantfoldError::MissingColumn {
                table: "features".to_string(),
                column: self.column.clone(),
            })
    }
}
