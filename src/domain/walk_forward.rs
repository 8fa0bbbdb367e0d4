//! Walk-forward evaluation: fit one model per fold, simulate its test rows.
//!
//! Folds run in parallel on the rayon pool. Each fold builds its own model
//! and simulator state; results come back in fold order so the aggregate is
//! the same however the pool schedules the work.

use std::ops::Range;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::backtest::{simulate, BacktestConfig, BacktestResult};
use crate::domain::error::QuantfoldError;
use crate::domain::fold::{Fold, Segment};
use crate::domain::metrics::{BacktestSummary, SummaryField};
use crate::domain::table::FeatureTable;
use crate::ports::model_port::ModelTrainer;

#[derive(Debug, Clone, PartialEq)]
pub struct FoldReport {
    pub index: usize,
    pub train_rows: usize,
    pub test_rows: Range<usize>,
    pub summary: BacktestSummary,
    pub objective: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardReport {
    pub objective: SummaryField,
    pub folds: Vec<FoldReport>,
    /// Mean of the per-fold objective; NaN if any fold's objective is NaN.
    pub mean_objective: f64,
}

fn evaluate_fold<T: ModelTrainer>(
    fold: &Fold,
    trainer: &T,
    config: &BacktestConfig,
    objective: SummaryField,
) -> Result<FoldReport, QuantfoldError> {
    let model = trainer.fit(&fold.train, fold.validate.as_ref())?;
    let result = simulate(&model, &fold.test, config)?;
    let value = result.summary.field(objective);
    debug!(
        fold = fold.index,
        train_rows = fold.train.len(),
        test_rows = fold.test.len(),
        trades = result.summary.num_trades,
        objective = value,
        "fold evaluated"
    );
    Ok(FoldReport {
        index: fold.index,
        train_rows: fold.train.len(),
        test_rows: fold.test.rows.clone(),
        summary: result.summary,
        objective: value,
    })
}

pub fn walk_forward<T: ModelTrainer>(
    folds: &[Fold],
    trainer: &T,
    config: &BacktestConfig,
    objective: SummaryField,
) -> Result<WalkForwardReport, QuantfoldError> {
    config.validate()?;

    let reports = folds
        .par_iter()
        .map(|fold| evaluate_fold(fold, trainer, config, objective))
        .collect::<Result<Vec<_>, _>>()?;

    let mean_objective =
        reports.iter().map(|r| r.objective).sum::<f64>() / reports.len() as f64;
    info!(
        folds = reports.len(),
        objective = %objective,
        mean = mean_objective,
        "walk-forward complete"
    );
    Ok(WalkForwardReport {
        objective,
        folds: reports,
        mean_objective,
    })
}

/// Fit on every row of `train` and simulate the reserved `holdout` rows.
pub fn evaluate_holdout<T: ModelTrainer>(
    train: &FeatureTable,
    holdout: &FeatureTable,
    trainer: &T,
    config: &BacktestConfig,
) -> Result<BacktestResult, QuantfoldError> {
    config.validate()?;
    let train = Segment::from_table(train, 0..train.len())?;
    let holdout = Segment::from_table(holdout, 0..holdout.len())?;
    let model = trainer.fit(&train, None)?;
    let result = simulate(&model, &holdout, config)?;
    info!(
        rows = holdout.len(),
        trades = result.summary.num_trades,
        final_balance = result.summary.final_balance,
        "holdout evaluated"
    );
    Ok(result)
}
