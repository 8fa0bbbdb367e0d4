//! Walk-forward fold generation.
//!
//! Expanding window: every training segment starts at row 0 and only its end
//! grows. Test windows tile `[initial_train_end, N)` in order, the last one
//! absorbing the remainder. Nothing is shuffled.

use std::ops::Range;

use tracing::debug;

use crate::domain::error::QuantfoldError;
use crate::domain::staging::TARGET_COLUMN;
use crate::domain::table::FeatureTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldConfig {
    pub n_folds: usize,
    pub initial_train_frac: f64,
    pub val_frac: f64,
    pub emit_validation: bool,
}

impl Default for FoldConfig {
    fn default() -> Self {
        FoldConfig {
            n_folds: 5,
            initial_train_frac: 0.3,
            val_frac: 0.2,
            emit_validation: false,
        }
    }
}

impl FoldConfig {
    pub fn validate(&self) -> Result<(), QuantfoldError> {
        if self.n_folds < 1 {
            return Err(QuantfoldError::InvalidFolds {
                reason: "n_folds must be at least 1".into(),
            });
        }
        if !(self.initial_train_frac > 0.0 && self.initial_train_frac < 1.0) {
            return Err(QuantfoldError::InvalidFolds {
                reason: format!(
                    "initial_train_frac must be in (0, 1), got {}",
                    self.initial_train_frac
                ),
            });
        }
        if !(self.val_frac >= 0.0 && self.val_frac < 1.0) {
            return Err(QuantfoldError::InvalidFolds {
                reason: format!("val_frac must be in [0, 1), got {}", self.val_frac),
            });
        }
        Ok(())
    }
}

/// Row ranges of one fold; `train.end <= validate.start <= test.start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldBounds {
    pub train: Range<usize>,
    pub validate: Option<Range<usize>>,
    pub test: Range<usize>,
}

/// Compute fold row ranges for a table of `n` rows.
///
/// With validation enabled the validation rows are carved from the tail of
/// the training window: the split sits at `floor(n_train * (1 - val_frac))`
/// clamped to `[1, n_train - 1]`, so both parts keep at least one row.
pub fn fold_bounds(n: usize, config: &FoldConfig) -> Result<Vec<FoldBounds>, QuantfoldError> {
    config.validate()?;

    let initial_train_end = (n as f64 * config.initial_train_frac).floor() as usize;
    if initial_train_end >= n {
        return Err(QuantfoldError::InvalidFolds {
            reason: format!(
                "initial_train_frac {} leaves no rows for testing out of {n}",
                config.initial_train_frac
            ),
        });
    }
    let test_window = ((n - initial_train_end) / config.n_folds).max(1);

    let mut bounds = Vec::with_capacity(config.n_folds);
    for i in 0..config.n_folds {
        let train_end = initial_train_end + i * test_window;
        let test_start = train_end.min(n);
        let test_end = if i + 1 < config.n_folds {
            (test_start + test_window).min(n)
        } else {
            n
        };

        if train_end <= 1 || test_start >= test_end {
            continue;
        }

        let (train, validate) = if config.emit_validation {
            let split = ((train_end as f64 * (1.0 - config.val_frac)).floor() as usize)
                .max(1)
                .min(train_end - 1);
            (0..split, Some(split..train_end))
        } else {
            (0..train_end, None)
        };

        bounds.push(FoldBounds {
            train,
            validate,
            test: test_start..test_end,
        });
    }
    Ok(bounds)
}

/// Aligned feature rows and labels for one contiguous row range.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub rows: Range<usize>,
    pub timestamps: Vec<i64>,
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<Option<f64>>>,
    pub targets: Vec<f64>,
}

impl Segment {
    /// Split `rows` of `table` into features (every column but the label)
    /// and targets. Labels must be defined.
    pub fn from_table(table: &FeatureTable, rows: Range<usize>) -> Result<Self, QuantfoldError> {
        let target = table.require_column(TARGET_COLUMN)?;
        let feature_columns: Vec<_> = table
            .columns()
            .iter()
            .filter(|c| c.name != TARGET_COLUMN)
            .collect();

        let targets = rows
            .clone()
            .map(|row| target[row].ok_or(QuantfoldError::UndefinedTarget { row }))
            .collect::<Result<Vec<_>, _>>()?;
        let features = rows
            .clone()
            .map(|row| feature_columns.iter().map(|c| c.values[row]).collect())
            .collect();

        Ok(Self {
            timestamps: table.timestamps()[rows.clone()].to_vec(),
            feature_names: feature_columns.iter().map(|c| c.name.clone()).collect(),
            features,
            targets,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub index: usize,
    pub train: Segment,
    pub validate: Option<Segment>,
    pub test: Segment,
}

pub fn make_folds(table: &FeatureTable, config: &FoldConfig) -> Result<Vec<Fold>, QuantfoldError> {
    table.require_column(TARGET_COLUMN)?;
    let bounds = fold_bounds(table.len(), config)?;

    let folds = bounds
        .into_iter()
        .enumerate()
        .map(|(index, b)| {
            debug!(
                fold = index,
                train = ?b.train,
                validate = ?b.validate,
                test = ?b.test,
                "fold bounds"
            );
            Ok(Fold {
                index,
                train: Segment::from_table(table, b.train)?,
                validate: b
                    .validate
                    .map(|r| Segment::from_table(table, r))
                    .transpose()?,
                test: Segment::from_table(table, b.test)?,
            })
        })
        .collect::<Result<Vec<_>, QuantfoldError>>()?;

    if folds.is_empty() {
        return Err(QuantfoldError::InvalidFolds {
            reason: format!("no fold has both training and test rows out of {}", table.len()),
        });
    }
    Ok(folds)
}

/// One chronological train/validate/test split by fractions of the row count.
pub fn train_validate_test_split(
    table: &FeatureTable,
    train_size: f64,
    validate_size: f64,
) -> Result<(Segment, Segment, Segment), QuantfoldError> {
    let in_unit = |v: f64| (0.0..=1.0).contains(&v);
    if !in_unit(train_size) || !in_unit(validate_size) || train_size + validate_size > 1.0 {
        return Err(QuantfoldError::InvalidFolds {
            reason: format!(
                "train_size {train_size} and validate_size {validate_size} must be fractions summing to at most 1"
            ),
        });
    }
    let n = table.len();
    let train_end = (n as f64 * train_size).floor() as usize;
    let validate_end = (train_end + (n as f64 * validate_size).floor() as usize).min(n);

    Ok((
        Segment::from_table(table, 0..train_end)?,
        Segment::from_table(table, train_end..validate_end)?,
        Segment::from_table(table, validate_end..n)?,
    ))
}

/// Reserve the trailing `holdout_frac` of rows as an out-of-sample table.
pub fn holdout_split(
    table: &FeatureTable,
    holdout_frac: f64,
) -> Result<(FeatureTable, FeatureTable), QuantfoldError> {
    if !(0.0..1.0).contains(&holdout_frac) {
        return Err(QuantfoldError::InvalidFolds {
            reason: format!("holdout_frac must be in [0, 1), got {holdout_frac}"),
        });
    }
    let n = table.len();
    let split = n - (n as f64 * holdout_frac).floor() as usize;
    Ok((table.slice(0..split), table.slice(split..n)))
}
