//! Causal cross-timeframe merge.
//!
//! For a target bar opening at `T` and another timeframe of duration `d`,
//! the attached row is the latest one with `timestamp <= T - d`: a bar that
//! opened at `T - d` has closed by `T`, anything later has not. Lookups that
//! fall before the epoch, or before the first source bar, are undefined.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::domain::error::QuantfoldError;
use crate::domain::table::{Column, FeatureTable};

/// For each query, the index of the last source timestamp `<= query - offset`.
///
/// Both slices must be sorted ascending. A single forward sweep, so the cost
/// is linear in the combined length.
pub fn backward_match(queries: &[i64], source: &[i64], offset: i64) -> Vec<Option<usize>> {
    let mut cursor = 0usize;
    queries
        .iter()
        .map(|&t| {
            let lookup = t - offset;
            if lookup < 0 {
                return None;
            }
            while cursor < source.len() && source[cursor] <= lookup {
                cursor += 1;
            }
            cursor.checked_sub(1)
        })
        .collect()
}

/// Attach every table in `others` onto `target`, columns prefixed `{tf}_`.
///
/// The result has exactly `target.len()` rows in target order. Undefined
/// lookups stay undefined.
pub fn merge_timeframes(
    target: &FeatureTable,
    target_tf: u32,
    others: &BTreeMap<u32, FeatureTable>,
) -> Result<FeatureTable, QuantfoldError> {
    if others.contains_key(&target_tf) {
        return Err(QuantfoldError::SelfMerge {
            tf_minutes: target_tf,
        });
    }

    let mut merged = target.clone();
    for (&tf, other) in others {
        let offset = i64::from(tf) * 60;
        let matches = backward_match(target.timestamps(), other.timestamps(), offset);
        let other = other.clone().prefixed(&format!("{tf}_"));

        for column in other.columns() {
            let name = column.name.clone();
            if merged.column(&name).is_some() {
                return Err(QuantfoldError::invalid(
                    "pipeline",
                    "timeframes",
                    format!("merged column '{name}' collides with an existing column"),
                ));
            }
            let values = matches
                .iter()
                .map(|m| m.and_then(|i| column.values[i]))
                .collect();
            merged = merged.with_column(Column::new(name, values))?;
        }

        debug!(
            source = other.label(),
            timeframe = tf,
            unmatched = matches.iter().filter(|m| m.is_none()).count(),
            "merged timeframe"
        );
    }

    info!(
        target = target_tf,
        timeframes = others.len(),
        rows = merged.len(),
        rows_with_undefined = merged.count_undefined_rows(),
        "timeframe merge complete"
    );
    Ok(merged)
}

/// Split `tables` into target and others, then merge.
pub fn merge_all(
    mut tables: BTreeMap<u32, FeatureTable>,
    target_tf: u32,
) -> Result<FeatureTable, QuantfoldError> {
    let target = tables
        .remove(&target_tf)
        .ok_or(QuantfoldError::TargetTimeframeAbsent {
            tf_minutes: target_tf,
        })?;
    merge_timeframes(&target, target_tf, &tables)
}
