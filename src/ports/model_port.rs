//! Model collaborator ports.
//!
//! The simulator only ever sees a fitted [`PricePredictor`]; training lives
//! behind [`ModelTrainer`] so walk-forward evaluation can fit one model per
//! fold without knowing what the model is.

use crate::domain::error::QuantfoldError;
use crate::domain::fold::Segment;

/// A fitted model mapping one feature row to a predicted price.
///
/// Rows are in the fold's feature column order; `None` marks an undefined
/// value. Calls may block; the simulator never retries.
pub trait PricePredictor {
    fn predict(&self, features: &[Option<f64>]) -> f64;

    /// Must agree with `predict` row for row.
    fn predict_batch(&self, rows: &[Vec<Option<f64>>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

impl<F> PricePredictor for F
where
    F: Fn(&[Option<f64>]) -> f64,
{
    fn predict(&self, features: &[Option<f64>]) -> f64 {
        self(features)
    }
}

/// Fits a fresh model for one fold.
pub trait ModelTrainer: Sync {
    type Model: PricePredictor;

    fn fit(
        &self,
        train: &Segment,
        validate: Option<&Segment>,
    ) -> Result<Self::Model, QuantfoldError>;
}
