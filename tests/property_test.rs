//! Property tests for the merge, fold, and simulator invariants.

use approx::assert_relative_eq;
use proptest::prelude::*;
use quantfold::domain::backtest::{simulate_predictions, BacktestConfig};
use quantfold::domain::fold::{fold_bounds, FoldConfig};
use quantfold::domain::merge::{backward_match, merge_timeframes};
use quantfold::domain::metrics::{BacktestSummary, SORTINO_PENALTY};
use quantfold::domain::table::{Column, FeatureTable};
use std::collections::BTreeMap;

/// Strictly increasing timestamps built from positive gaps.
fn timestamps(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    (0i64..5_000, prop::collection::vec(1i64..2_000, 0..max_len)).prop_map(|(start, gaps)| {
        let mut ts = start;
        let mut out = vec![ts];
        for gap in gaps {
            ts += gap;
            out.push(ts);
        }
        out
    })
}

fn encoded_table(label: &str, timestamps: Vec<i64>) -> FeatureTable {
    let values = timestamps.iter().map(|&t| Some(t as f64)).collect();
    FeatureTable::new(label, timestamps, vec![Column::new("close", values)]).unwrap()
}

proptest! {
    #[test]
    fn backward_match_agrees_with_brute_force(
        queries in timestamps(60),
        source in timestamps(60),
        offset in 0i64..3_000,
    ) {
        let matched = backward_match(&queries, &source, offset);
        prop_assert_eq!(matched.len(), queries.len());
        for (q, m) in queries.iter().zip(&matched) {
            let lookup = q - offset;
            let expected = if lookup < 0 {
                None
            } else {
                source.iter().rposition(|&s| s <= lookup)
            };
            prop_assert_eq!(*m, expected);
        }
    }

    #[test]
    fn merged_values_never_look_ahead(
        target_ts in timestamps(80),
        other_ts in timestamps(40),
        tf in prop::sample::select(vec![1u32, 5, 15, 60]),
    ) {
        let target = encoded_table("target", target_ts.clone());
        let mut others = BTreeMap::new();
        others.insert(tf, encoded_table("other", other_ts));
        let merged = merge_timeframes(&target, 3, &others).unwrap();

        prop_assert_eq!(merged.len(), target.len());
        prop_assert_eq!(merged.timestamps(), target_ts.as_slice());

        let duration = i64::from(tf) * 60;
        let column = merged.column(&format!("{tf}_close")).unwrap();
        for (t, v) in target_ts.iter().zip(column) {
            if let Some(source_ts) = v {
                prop_assert!(*source_ts as i64 + duration <= *t);
            }
        }
    }

    #[test]
    fn folds_are_ordered_and_cover_the_tail(
        n in 1usize..600,
        n_folds in 1usize..12,
        frac in 0.05f64..0.95,
        emit_validation in any::<bool>(),
    ) {
        let config = FoldConfig {
            n_folds,
            initial_train_frac: frac,
            val_frac: 0.2,
            emit_validation,
        };
        let bounds = fold_bounds(n, &config).unwrap();
        let initial = (n as f64 * frac).floor() as usize;

        for b in &bounds {
            prop_assert!(b.train.start == 0);
            prop_assert!(!b.train.is_empty());
            prop_assert!(!b.test.is_empty());
            prop_assert!(b.test.end <= n);
            match &b.validate {
                Some(v) => {
                    prop_assert_eq!(b.train.end, v.start);
                    prop_assert_eq!(v.end, b.test.start);
                    prop_assert!(!v.is_empty());
                }
                None => prop_assert_eq!(b.train.end, b.test.start),
            }
        }
        for pair in bounds.windows(2) {
            prop_assert!(pair[0].test.end <= pair[1].test.start);
        }
        if initial >= 2 {
            // test windows tile initial..n with no gaps
            prop_assert_eq!(bounds.first().map(|b| b.test.start), Some(initial));
            prop_assert_eq!(bounds.last().map(|b| b.test.end), Some(n));
            for pair in bounds.windows(2) {
                prop_assert_eq!(pair[0].test.end, pair[1].test.start);
            }
        }
    }

    #[test]
    fn simulation_is_deterministic(
        targets in prop::collection::vec(1.0f64..500.0, 0..80),
        noise in prop::collection::vec(-5.0f64..5.0, 80),
        fee_rate in 0.0f64..0.01,
    ) {
        let predicted: Vec<f64> = targets.iter().zip(&noise).map(|(t, n)| t + n).collect();
        let config = BacktestConfig { fee_rate, ..BacktestConfig::default() };

        let first = simulate_predictions(&predicted, &targets, &config).unwrap();
        let second = simulate_predictions(&predicted, &targets, &config).unwrap();
        prop_assert_eq!(format!("{first:?}"), format!("{second:?}"));
        prop_assert_eq!(first.balance_history.len(), targets.len());
        prop_assert!(first.trades.len() <= targets.len().saturating_sub(1));

        let total: f64 = first.trades.iter().map(|t| t.profit).sum();
        if let Some(last) = first.balance_history.last() {
            assert_relative_eq!(*last, config.initial_balance + total, max_relative = 1e-9);
        }
        prop_assert!((0.0..=1.0).contains(&first.summary.max_drawdown));
    }

    #[test]
    fn never_buying_scores_the_penalty(
        targets in prop::collection::vec(1.0f64..500.0, 0..50),
    ) {
        let predicted = vec![0.0; targets.len()];
        let result = simulate_predictions(&predicted, &targets, &BacktestConfig::default()).unwrap();
        prop_assert_eq!(result.summary.num_trades, 0);
        prop_assert_eq!(result.summary.win_rate, 0.0);
        prop_assert_eq!(result.summary.sortino_ratio, SORTINO_PENALTY);
        prop_assert_eq!(result.summary.max_drawdown, 0.0);
    }
}

#[test]
fn empty_summary_is_flat() {
    let summary = BacktestSummary::compute(10_000.0, &[], &[]);
    assert_eq!(summary.final_balance, 10_000.0);
    assert_eq!(summary.total_profit, 0.0);
    assert_eq!(summary.sortino_ratio, SORTINO_PENALTY);
}
